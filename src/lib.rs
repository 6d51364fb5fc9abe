pub mod euchre;
pub mod harness;
