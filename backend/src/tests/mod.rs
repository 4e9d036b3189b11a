pub mod common;

mod extension_service_test;
