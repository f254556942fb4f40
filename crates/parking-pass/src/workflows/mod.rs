pub mod parking;
