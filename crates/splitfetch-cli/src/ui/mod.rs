pub mod progress;
pub mod prompt;
pub mod reporter;

pub use prompt::StdinChooser;
pub use reporter::ConsoleReporter;
