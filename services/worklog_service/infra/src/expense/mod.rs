pub mod repository;
pub mod service;

pub use repository::PgExpenseRepository;
pub use service::ExpenseServiceImpl;
