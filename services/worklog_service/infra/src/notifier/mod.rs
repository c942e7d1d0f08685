pub mod dispatcher;
pub mod smtp_sender;

pub use dispatcher::EmailNotifier;
pub use smtp_sender::{EmailSender, SmtpConfig, SmtpEmailSender};
