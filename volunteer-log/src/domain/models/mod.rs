mod access_token;
mod outcome;
mod sheet_row;
mod time_entry;

pub use access_token::*;
pub use outcome::*;
pub use sheet_row::*;
pub use time_entry::*;
