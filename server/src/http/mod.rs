pub mod battles;
pub mod health;
pub mod routes;
