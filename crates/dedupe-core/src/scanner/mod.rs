pub mod walk;

pub use walk::FileWalker;
