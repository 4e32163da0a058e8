pub mod kinematics;
pub mod structure;
