pub mod event;
pub mod registration;
pub mod waiting_list;
pub mod payment;
pub mod history;
pub mod no_show;

pub use event::*;
pub use registration::*;
pub use waiting_list::*;
pub use payment::*;
pub use history::*;
pub use no_show::*;
