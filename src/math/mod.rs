pub mod eigen;
