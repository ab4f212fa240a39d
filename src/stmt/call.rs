//! stmt/call.rs - `call`/`uncall` module-activation statements.
//!
//! Both dispatch to [`Synthesizer::activate_module`], which binds formals
//! to the caller's actuals by name, declares fresh lines for the callee's
//! locals, and runs the body forward (`call`) or forward-then-reverse-
//! replayed (`uncall`) — see that method's doc comment for why reverse
//! replay alone computes the exact inverse.

use crate::error::SynthesisError;
use crate::synthesizer::{Bindings, Synthesizer};

pub(crate) fn on_call(synth: &mut Synthesizer, bindings: &Bindings, target: &str, actuals: &[String]) -> Result<(), SynthesisError> {
    let module = synth.find_module(target).ok_or_else(|| SynthesisError::UnknownModule(target.to_string()))?;
    synth.activate_module(module, bindings, actuals, true)
}

pub(crate) fn on_uncall(synth: &mut Synthesizer, bindings: &Bindings, target: &str, actuals: &[String]) -> Result<(), SynthesisError> {
    let module = synth.find_module(target).ok_or_else(|| SynthesisError::UnknownModule(target.to_string()))?;
    synth.activate_module(module, bindings, actuals, false)
}
