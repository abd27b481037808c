pub mod bus;
pub mod mpc;
pub mod register;
pub mod sim;
