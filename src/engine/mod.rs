pub mod access;
pub mod context;
pub mod solver;
pub mod task_list;

pub use access::{DataAccess, InputData, Invocation};
pub use context::TickContext;
pub use solver::Solver;
pub use task_list::{TaskList, TaskSlot};
