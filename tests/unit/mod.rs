mod bib_tests;
mod config_tests;
mod extract_tests;
mod output_tests;
