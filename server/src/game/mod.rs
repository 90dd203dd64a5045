pub mod ai;
pub mod combat;
pub mod hooks;
pub mod logic;
pub mod rules;
pub mod session;
pub mod turns;
pub mod types;
