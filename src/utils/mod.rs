mod errors;
mod io_utils;

pub use errors::AlignError;
pub use io_utils::{create_writer, open_text_reader, open_text_writer};

pub type Result<T> = std::result::Result<T, String>;

pub fn handle_error_and_exit(err: String) -> ! {
    log::error!("{}", err);
    std::process::exit(1);
}
