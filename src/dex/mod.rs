//! Driving one DEX image through the pipeline: walking its method bodies,
//! resolving method identities through the `dex` crate's constant pool,
//! and assembling the per-method graphs into a [`ProgramGraph`].

pub mod errors;
pub mod header;
pub mod image;

pub use errors::{HeaderError, ImageError, MethodError};
pub use header::DexHeader;

use std::io::Write;

use dex::Dex;
use log::{debug, error, info};

use crate::cfg::{self, MethodGraph, MethodInfo, ProgramGraph};

/// Build every method graph of one DEX and link its call sites.
///
/// A method that fails to decode is logged and skipped; the rest of the
/// image still produces graphs.
pub fn build_graphs<T: AsRef<[u8]>>(
    dex: &Dex<T>,
    bytes: &[u8],
    header: &DexHeader,
) -> Result<ProgramGraph, ImageError> {
    let mut program = ProgramGraph::default();
    for body in image::method_bodies(bytes, header)? {
        let Some(info) = method_info(dex, body.method_idx) else {
            continue;
        };
        let code = match image::code_units(bytes, body.code_off) {
            Ok(code) => code,
            Err(e) => {
                error!("{}{}: {e}", info.class_descriptor, info.name);
                continue;
            }
        };
        if code.is_empty() {
            continue;
        }
        let code_base = (body.code_off + image::CODE_ITEM_INSNS_OFFSET) as u64;
        let method = program.methods.len() as u32;
        let nodes = match cfg::build_nodes(&code, code_base, |idx| method_info(dex, idx as u32)) {
            Ok(nodes) => nodes,
            Err(source) => {
                let e = MethodError {
                    class_name: info.class_descriptor.clone(),
                    method_name: info.name.clone(),
                    source,
                };
                error!("{e}");
                continue;
            }
        };
        debug!(
            "{}{}: {} instructions",
            info.class_descriptor,
            info.name,
            nodes.len()
        );
        program
            .methods
            .push(MethodGraph::build(info, nodes, &code, method));
    }
    program.link_calls();
    Ok(program)
}

/// Resolve a method-id table entry to a [`MethodInfo`]. Out-of-range
/// indices and broken pool references are logged and yield `None`, which
/// downstream treats as an external callee.
pub fn method_info<T: AsRef<[u8]>>(dex: &Dex<T>, method_idx: u32) -> Option<MethodInfo> {
    let item = match dex.get_method_item(method_idx as u64) {
        Ok(item) => item,
        Err(e) => {
            error!("method@{method_idx}: {e}");
            return None;
        }
    };
    match (
        dex.get_type(item.class_idx() as u32),
        dex.get_string(item.name_idx() as u32),
        dex.get_proto_item(item.proto_idx() as u64),
    ) {
        (Ok(class_type), Ok(name), Ok(proto)) => {
            let ret = match dex.get_type(proto.return_type()) {
                Ok(ret) => ret.to_string(),
                Err(e) => {
                    error!("method@{method_idx}: {e}");
                    return None;
                }
            };
            let params = if proto.params_off() == 0 {
                String::new()
            } else {
                match dex.get_interfaces(proto.params_off()) {
                    Ok(params) => params.iter().map(|p| p.to_string()).collect(),
                    Err(e) => {
                        error!("method@{method_idx}: {e}");
                        return None;
                    }
                }
            };
            Some(MethodInfo {
                method_idx,
                class_idx: item.class_idx() as u32,
                proto_idx: item.proto_idx() as u32,
                name_idx: item.name_idx() as u32,
                class_descriptor: class_type.to_string(),
                name: name.to_string(),
                signature: format!("({params}){ret}"),
            })
        }
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
            error!("method@{method_idx}: {e}");
            None
        }
    }
}

/// The `-l plain` listing: one log line per method.
pub fn list_plain<T: AsRef<[u8]>>(dex: &Dex<T>) {
    for class in dex.classes().filter_map(Result::ok) {
        for method in class.methods() {
            info!("{}.{}", class.jtype().to_java_type(), method.name());
        }
    }
}

/// The `-l xml` listing: a package/class/method tree on the output stream.
pub fn list_xml<T: AsRef<[u8]>, W: Write>(dex: &Dex<T>, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "<api>")?;
    for class in dex.classes().filter_map(Result::ok) {
        writeln!(out, "  <class name=\"{}\">", class.jtype().to_java_type())?;
        for method in class.methods() {
            let params: String = method.params().iter().map(|p| p.to_string()).collect();
            writeln!(
                out,
                "    <method name=\"{}\" signature=\"({}){}\"/>",
                method.name(),
                params,
                method.return_type(),
            )?;
        }
        writeln!(out, "  </class>")?;
    }
    writeln!(out, "</api>")
}
