//! Keys and default values for spindle configuration.

/// Process loops in the reverse of their declared (outer-first) order.
pub const CONF_LOOPS_REVERSE_KEY: &str = "spindle.loops.reverse";
pub const CONF_LOOPS_REVERSE_DEFAULT: bool = false;

/// Registry name of the annotation-discovery implementation to load at startup.
pub const CONF_ANNOTATION_PROVIDER_KEY: &str = "spindle.annotations.provider";
pub const CONF_ANNOTATION_PROVIDER_DEFAULT: &str = "none";

/// Run the intrinsic constant-folding pass after the loop rewrite.
pub const CONF_FOLD_INTRINSICS_KEY: &str = "spindle.optimization.applyFoldIntrinsics";
pub const CONF_FOLD_INTRINSICS_DEFAULT: bool = true;
