// Integration tests for the transfer engine
// Runs full upload/download cycles against an in-memory object store

mod support;

mod download_tests;
mod mode_tests;
