mod hosted;

pub use hosted::RigLlm;
