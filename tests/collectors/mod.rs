mod commands;
mod keyspace;
