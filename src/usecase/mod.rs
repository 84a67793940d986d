pub mod activity;
pub mod filter;
pub mod grouping;
pub mod mutation;
pub mod review;
