pub mod root;
pub mod public;
pub mod me;
pub mod events;
pub mod registrations;
pub mod waiting_list;
pub mod admin;
