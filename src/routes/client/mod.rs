mod handler;
mod model;

pub use handler::{
    ChangePasswordRequest, ClientInquiryRequest, UpdateProfileRequest, change_password,
    create_client, create_my_inquiry, current_client, get_profile, list_my_inquiries,
    list_my_projects, update_profile,
};
pub use model::{
    Client, ClientChanges, ClientFilter, ClientProfile, CreateClientRequest, MIN_PASSWORD_LEN,
    NewClient, check_password,
};
