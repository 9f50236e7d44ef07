mod config;
mod helper;
mod register;
