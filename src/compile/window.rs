// Window Clause Compiler
//
// Converts OVER clauses and named WINDOW definitions. GROUPS framing is
// not supported.

use linked_hash_map::LinkedHashMap;
use sqlparser::ast;

use crate::compile::expr::{convert_expr, convert_sort_field};
use crate::error::{ParseError, ParseResult};
use crate::plan::expr::{FrameBound, FrameSpecification, FrameUnit, WindowDefinition};
use crate::session::Session;

pub(crate) fn convert_window_type(
    session: &Session,
    window: &ast::WindowType,
) -> ParseResult<WindowDefinition> {
    match window {
        ast::WindowType::NamedWindow(name) => Ok(WindowDefinition {
            name_ref: Some(name.value.clone()),
            ..WindowDefinition::default()
        }),
        ast::WindowType::WindowSpec(spec) => convert_window_spec(session, spec),
    }
}

pub(crate) fn convert_window_spec(
    session: &Session,
    spec: &ast::WindowSpec,
) -> ParseResult<WindowDefinition> {
    let mut partition_by = Vec::with_capacity(spec.partition_by.len());
    for expr in &spec.partition_by {
        partition_by.push(convert_expr(session, expr)?);
    }
    let mut order_by = Vec::with_capacity(spec.order_by.len());
    for order in &spec.order_by {
        order_by.push(convert_sort_field(session, order)?);
    }
    let frame = match &spec.window_frame {
        Some(frame) => Some(convert_frame(session, frame)?),
        None => None,
    };
    Ok(WindowDefinition {
        partition_by,
        order_by,
        frame,
        name_ref: spec.window_name.as_ref().map(|n| n.value.clone()),
    })
}

/// Named WINDOW-clause definitions, in declaration order.
pub(crate) fn convert_named_windows(
    session: &Session,
    windows: &[ast::NamedWindowDefinition],
) -> ParseResult<LinkedHashMap<String, WindowDefinition>> {
    let mut named = LinkedHashMap::new();
    for ast::NamedWindowDefinition(name, expr) in windows {
        let definition = match expr {
            ast::NamedWindowExpr::WindowSpec(spec) => convert_window_spec(session, spec)?,
            ast::NamedWindowExpr::NamedWindow(reference) => WindowDefinition {
                name_ref: Some(reference.value.clone()),
                ..WindowDefinition::default()
            },
        };
        named.insert(name.value.clone(), definition);
    }
    Ok(named)
}

fn convert_frame(session: &Session, frame: &ast::WindowFrame) -> ParseResult<FrameSpecification> {
    let unit = match frame.units {
        ast::WindowFrameUnits::Rows => FrameUnit::Rows,
        ast::WindowFrameUnits::Range => FrameUnit::Range,
        ast::WindowFrameUnits::Groups => {
            return Err(ParseError::UnsupportedFeature(
                "GROUPS window framing".to_string(),
            ));
        }
    };
    let start = convert_frame_bound(session, &frame.start_bound)?;
    // BETWEEN omitted: the frame runs from the start bound to the current
    // row.
    let end = match &frame.end_bound {
        Some(bound) => convert_frame_bound(session, bound)?,
        None => FrameBound::CurrentRow,
    };
    Ok(FrameSpecification { unit, start, end })
}

fn convert_frame_bound(
    session: &Session,
    bound: &ast::WindowFrameBound,
) -> ParseResult<FrameBound> {
    match bound {
        ast::WindowFrameBound::CurrentRow => Ok(FrameBound::CurrentRow),
        ast::WindowFrameBound::Preceding(None) => Ok(FrameBound::UnboundedPreceding),
        ast::WindowFrameBound::Preceding(Some(expr)) => Ok(FrameBound::Preceding(Box::new(
            convert_expr(session, expr)?,
        ))),
        ast::WindowFrameBound::Following(None) => Ok(FrameBound::UnboundedFollowing),
        ast::WindowFrameBound::Following(Some(expr)) => Ok(FrameBound::Following(Box::new(
            convert_expr(session, expr)?,
        ))),
    }
}
