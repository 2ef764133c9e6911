//! Transaction building
//!
//! Resolve a call against the metadata, type-check and encode its arguments, and pin it to a
//! signing context.

pub mod calls;
pub mod types;

use crate::codec::TypeRegistry;
use crate::error::WasmSubstrateError;
use crate::transaction::UnsignedTransaction;
use crate::types::SigningContext;
use types::CallDescriptor;

/// Build an unsigned transaction
///
/// # Arguments
/// * `call` - Pallet, call and ordered argument values
/// * `ctx` - Sender, nonce, tip, era and the chain versions the transaction targets
/// * `registry` - Type registry for the runtime the context targets
pub fn build(
    call: &CallDescriptor,
    ctx: &SigningContext,
    registry: &TypeRegistry,
) -> Result<UnsignedTransaction, WasmSubstrateError> {
    let metadata = registry.metadata();
    metadata.ensure_compatible(ctx.spec_version, ctx.transaction_version)?;

    let call_data = registry.encode_call(call)?;
    // the stored call is what the bytes decode to, so it matches what a parser reports
    let (canonical, _) = registry.decode_call(&call_data)?;

    let extrinsic = metadata.extrinsic();
    let address = registry.encode(extrinsic.address_ty, &registry.address_value(&ctx.sender))?;

    let tx = UnsignedTransaction::new(
        canonical,
        ctx.clone(),
        call_data,
        address,
        extrinsic.version,
        metadata.signed_extensions().to_vec(),
    );
    log::debug!(
        "Built {} for {} (nonce {}, era {:?}, {} bytes of call data)",
        tx.call().qualified_name(),
        ctx.sender,
        ctx.nonce,
        tx.era(),
        tx.call_data().len()
    );
    Ok(tx)
}

/// Build from a JSON call descriptor (`{ "pallet", "call", "args" }`)
pub fn build_from_json(
    call: &serde_json::Value,
    ctx: &SigningContext,
    registry: &TypeRegistry,
) -> Result<UnsignedTransaction, WasmSubstrateError> {
    let call = registry.call_from_json(call)?;
    build(&call, ctx, registry)
}
