//! Standard built-in tool implementations.

mod exec;
mod list_directory;
mod read_file;
mod write_file;

pub use exec::ExecTool;
pub use list_directory::ListDirectoryTool;
pub use read_file::ReadFileTool;
pub use write_file::WriteFileTool;
