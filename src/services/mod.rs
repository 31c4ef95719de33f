//! Business-logic layer. One service per domain; handlers stay thin.

pub mod catalog;
pub mod customers;
pub mod imei;
pub mod imports;
pub mod pos;
pub mod procurement;
pub mod reports;
pub mod service_jobs;
pub mod stock;
pub mod users;
