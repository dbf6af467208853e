pub mod credentials;
pub mod sheet;

pub use credentials::Credentials;
pub use sheet::SheetValues;
