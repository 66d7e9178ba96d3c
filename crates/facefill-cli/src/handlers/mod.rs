//! Command handlers - one module per subcommand, kept out of main.rs for
//! testability

pub mod eval;
pub mod infer;

pub use eval::{build_eval_config, execute_eval, parse_size, resolve_psnr_averaging};
pub use infer::{build_inference_config, execute_infer};
