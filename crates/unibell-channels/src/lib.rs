//! Messaging transports implementing [`unibell_core::traits::Messenger`].

pub mod telegram;

pub use telegram::TelegramMessenger;
