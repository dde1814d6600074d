mod bench;

pub use bench::TestBench;
