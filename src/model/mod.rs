pub mod attendance;
pub mod department;
pub mod employee;
pub mod role;
pub mod salary;
pub mod user;
