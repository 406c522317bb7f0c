pub mod command_diarizer;
