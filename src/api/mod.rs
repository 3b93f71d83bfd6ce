pub mod academic;
pub mod attendance;
pub mod cerapan;
pub mod settings;
pub mod user;
