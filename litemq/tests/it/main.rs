mod connection;
mod dequeue;
mod helper;
mod purge;
mod queue;
