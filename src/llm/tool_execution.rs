pub mod agent_loop;
pub mod dispatch;

pub use agent_loop::run_turn;
pub use dispatch::dispatch;
