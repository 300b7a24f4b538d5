pub mod measurements;
pub mod watches;
