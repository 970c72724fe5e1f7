pub mod export;
pub mod import;
pub mod init;
pub mod jobs;
pub mod run;
pub mod schemas;
pub mod session;
pub mod status;
pub mod sync;
