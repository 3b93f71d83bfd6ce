pub mod academic;
pub mod attendance;
pub mod cerapan;
pub mod role;
pub mod settings;
pub mod user;
