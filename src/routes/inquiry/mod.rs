mod handler;
mod model;

pub use handler::{InquiryReceipt, submit_inquiry};
pub use model::{Inquiry, InquiryChanges, InquiryFilter, InquiryStatus, NewInquiry};
