
/// Contains the writer for per-read likelihoods
pub mod likelihood_writer;
/// Contains the end-of-run summary writer
pub mod summary_writer;
