//! Tests for the DVI interpreter state machine.

mod common;

use common::{DviBuilder, TEN_PT, tfm_bytes};
use dviread_core::api::{interpret, interpret_partial};
use dviread_core::dvi::{
    DviDevice, Event, EventCounter, InterpState, Interpreter, PageCollector, Placement,
};
use dviread_core::error::DviError;
use dviread_core::font::{MetricsTable, NoMetrics, TfmMetrics};

fn one_font_page() -> DviBuilder {
    DviBuilder::new().font_def(0, "cmr10", TEN_PT).bop().fnt_num(0)
}

fn run_err(data: Vec<u8>) -> DviError {
    let mut interp = Interpreter::new(data);
    interp.run().unwrap_err()
}

fn cmr10_metrics() -> MetricsTable {
    // 'A' is half the design size wide, 'B' a quarter
    let tfm = tfm_bytes(0, TEN_PT * 16, &[(b'A', 1 << 19), (b'B', 1 << 18)]);
    let mut table = MetricsTable::new();
    table.insert("cmr10", TfmMetrics::parse("cmr10", tfm).unwrap());
    table
}

#[test]
fn single_char_page_round_trip() {
    let data = one_font_page().set_char(b'A').eop().finish();
    let mut interp = Interpreter::new(data);
    interp.run().unwrap();
    assert_eq!(interp.state(), InterpState::AfterPostamble);

    let doc = interp.into_document();
    assert!(doc.is_complete());
    assert_eq!(doc.page_count(), 1);
    assert_eq!(doc.fonts.len(), 1);
    assert_eq!(doc.font(0).unwrap().name, "cmr10");
    assert_eq!(doc.preamble.as_ref().unwrap().comment_text(), " test output");

    let page = &doc.pages[0];
    assert_eq!(page.number(), 1);
    assert_eq!(page.back_pointer, -1);
    assert_eq!(
        page.events,
        vec![
            Event::FontSelect { font: 0 },
            Event::Char {
                h: 0,
                v: 0,
                font: 0,
                code: u32::from(b'A'),
                width: None,
                placement: Placement::Set,
            },
        ]
    );
}

#[test]
fn w0_repeats_stored_value() {
    // w1 100, w0, then a char to observe h
    let data = one_font_page()
        .op(148)
        .op(100)
        .op(147)
        .set_char(b'x')
        .eop()
        .finish();
    let doc = interpret(data, &NoMetrics).unwrap();
    let Event::Char { h, v, .. } = doc.pages[0].events[1] else {
        panic!("expected a char event");
    };
    assert_eq!((h, v), (200, 0));
}

#[test]
fn movement_registers_store_and_repeat() {
    let data = one_font_page()
        .op(153) // x1 -3
        .op(0xfd)
        .op(152) // x0
        .op(162) // y1 7
        .op(7)
        .op(161) // y0
        .op(167) // z1 1
        .op(1)
        .op(166) // z0
        .down4(10)
        .set_char(b'x')
        .eop()
        .finish();
    let doc = interpret(data, &NoMetrics).unwrap();
    let Event::Char { h, v, .. } = doc.pages[0].events[1] else {
        panic!("expected a char event");
    };
    assert_eq!(h, -6);
    assert_eq!(v, 7 + 7 + 1 + 1 + 10);
}

#[test]
fn metrics_advance_set_but_not_put() {
    let data = one_font_page()
        .set_char(b'A')
        .put1(b'B')
        .set_char(b'B')
        .set_char(b'Z')
        .set_char(b'A')
        .eop()
        .finish();
    let table = cmr10_metrics();
    let doc = interpret(data, &table).unwrap();

    let chars: Vec<(i32, Option<i32>)> = doc.pages[0]
        .events
        .iter()
        .filter_map(|e| match e {
            Event::Char { h, width, .. } => Some((*h, *width)),
            _ => None,
        })
        .collect();
    let half = TEN_PT / 2;
    let quarter = TEN_PT / 4;
    assert_eq!(
        chars,
        vec![
            (0, Some(half)),
            (half, Some(quarter)),
            (half, Some(quarter)),
            // no metrics for 'Z': unknown width, h stays
            (half + quarter, None),
            (half + quarter, Some(half)),
        ]
    );
}

#[test]
fn rules_report_visibility_and_advance() {
    let data = one_font_page()
        .set_rule(10, 20)
        .set_rule(-1, 5)
        .put_rule(3, 0)
        .set_char(b'x')
        .eop()
        .finish();
    let doc = interpret(data, &NoMetrics).unwrap();
    let events = &doc.pages[0].events;
    assert_eq!(
        events[1],
        Event::Rule {
            h: 0,
            v: 0,
            height: 10,
            width: 20,
            visible: true,
            placement: Placement::Set,
        }
    );
    assert!(matches!(events[2], Event::Rule { h: 20, visible: false, .. }));
    assert!(matches!(
        events[3],
        Event::Rule {
            h: 25,
            visible: false,
            placement: Placement::Put,
            ..
        }
    ));
    assert!(matches!(events[4], Event::Char { h: 25, .. }));
}

#[test]
fn push_pop_restores_position_but_not_font() {
    let data = DviBuilder::new()
        .font_def(0, "cmr10", TEN_PT)
        .font_def(1, "cmbx10", TEN_PT)
        .bop()
        .fnt_num(0)
        .right4(50)
        .push()
        .right4(1000)
        .down4(1000)
        .fnt_num(1)
        .pop()
        .set_char(b'x')
        .eop()
        .finish();
    let doc = interpret(data, &NoMetrics).unwrap();
    let last = doc.pages[0].events.last().unwrap();
    assert!(matches!(last, Event::Char { h: 50, v: 0, font: 1, .. }));
}

#[test]
fn specials_carry_raw_payload() {
    let data = one_font_page()
        .right4(7)
        .special(b"color push rgb 1 0 0")
        .eop()
        .finish();
    let doc = interpret(data, &NoMetrics).unwrap();
    match &doc.pages[0].events[1] {
        Event::Special { h, v, payload } => {
            assert_eq!((*h, *v), (7, 0));
            assert_eq!(&payload[..], b"color push rgb 1 0 0");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn font_definition_and_nop_inside_page() {
    let data = DviBuilder::new()
        .op(138)
        .bop()
        .op(138)
        .font_def(3, "cmtt10", TEN_PT)
        .fnt_num(3)
        .set_char(b'x')
        .eop()
        .finish();
    let doc = interpret(data, &NoMetrics).unwrap();
    assert_eq!(doc.fonts.keys().copied().collect::<Vec<_>>(), vec![3]);
    assert_eq!(doc.pages[0].events.len(), 2);
}

#[test]
fn back_pointers_chain_pages() {
    let data = one_font_page()
        .set_char(b'a')
        .eop()
        .bop()
        .eop()
        .bop()
        .eop()
        .finish();
    let doc = interpret(data, &NoMetrics).unwrap();
    assert_eq!(doc.page_count(), 3);
    assert_eq!(doc.pages[1].back_pointer as usize, doc.pages[0].offset);
    assert_eq!(doc.pages[2].back_pointer as usize, doc.pages[1].offset);
    assert_eq!(doc.pages[2].number(), 3);
    let post = doc.postamble.unwrap();
    assert_eq!(post.total_pages, 3);
    assert_eq!(post.last_page as usize, doc.pages[2].offset);
    assert_eq!(post.post_pointer, Some(post.offset as i32));
}

#[test]
fn truncated_operand_reports_cursor_offset() {
    let builder = DviBuilder::new().bop();
    let right4_at = builder.len();
    let data = builder.op(146).raw(&[0x00, 0x01]).body();

    let err = run_err(data);
    match err {
        DviError::TruncatedStream {
            offset,
            wanted,
            remaining,
            opcode,
        } => {
            assert_eq!(offset, right4_at + 1);
            assert_eq!(wanted, 4);
            assert_eq!(remaining, 2);
            assert_eq!(opcode, Some(146));
        }
        ref other => panic!("expected TruncatedStream, got {other:?}"),
    }
    assert_eq!(err.offset(), Some(right4_at + 1));
    assert_eq!(err.opcode(), Some(146));
}

#[test]
fn partial_interpretation_reports_truncating_opcode() {
    let data = one_font_page().op(146).raw(&[0x00, 0x01]).body();
    let (doc, err) = interpret_partial(data, &NoMetrics);
    let err = err.unwrap();
    assert!(matches!(err, DviError::TruncatedStream { .. }));
    assert_eq!(err.opcode(), Some(146));
    assert_eq!(doc.page_count(), 1);
}

#[test]
fn truncated_opcode_byte_has_no_opcode() {
    // the stream ends where the next opcode should be
    let err = run_err(one_font_page().body());
    assert!(matches!(err, DviError::TruncatedStream { wanted: 1, .. }));
    assert_eq!(err.opcode(), None);
}

#[test]
fn eop_with_pushed_state_is_unbalanced() {
    let builder = one_font_page().push();
    let eop_at = builder.len();
    let err = run_err(builder.eop().finish());
    assert!(matches!(
        err,
        DviError::UnbalancedStack { offset, opcode: 140, depth: 1 } if offset == eop_at
    ));
    assert_eq!(err.offset(), Some(eop_at));
    assert_eq!(err.opcode(), Some(140));
}

#[test]
fn pop_on_empty_stack_underflows() {
    let err = run_err(one_font_page().pop().eop().finish());
    assert!(matches!(err, DviError::StackUnderflow { opcode: 142, .. }));
}

#[test]
fn selecting_undefined_font_fails() {
    let err = run_err(DviBuilder::new().bop().fnt_num(5).eop().finish());
    assert!(matches!(err, DviError::UndefinedFont { font: 5, opcode: 176, .. }));
}

#[test]
fn char_without_font_fails() {
    let err = run_err(DviBuilder::new().bop().set_char(b'a').eop().finish());
    assert!(matches!(err, DviError::NoFontSelected { opcode: 97, .. }));
}

#[test]
fn missing_preamble_is_malformed_header() {
    let mut data = DviBuilder::new().bop().eop().finish();
    data[0] = 139;
    let err = run_err(data);
    assert!(matches!(err, DviError::MalformedHeader { offset: 0, opcode: 139 }));
}

#[test]
fn reserved_opcodes_are_fatal() {
    let in_page = run_err(one_font_page().op(250).eop().finish());
    assert!(matches!(in_page, DviError::MalformedOpcode { opcode: 250, .. }));

    let between = run_err(DviBuilder::new().op(255).finish());
    assert!(matches!(between, DviError::UnexpectedOpcode { opcode: 255, .. }));

    let bop_in_page = run_err(one_font_page().bop().finish());
    assert!(matches!(bop_in_page, DviError::MalformedOpcode { opcode: 139, .. }));
}

#[test]
fn trailer_id_must_match_preamble() {
    let builder = one_font_page().set_char(b'a').eop();
    let err = run_err(builder.finish_with_id(5));
    assert!(matches!(
        err,
        DviError::VersionMismatch {
            opcode: 249,
            expected: 2,
            found: 5,
            ..
        }
    ));
    assert_eq!(err.opcode(), Some(249));
    assert!(err.offset().is_some());
}

#[test]
fn ptex_trailer_id_is_accepted() {
    let data = one_font_page().set_char(b'a').eop().finish_with_id(3);
    let doc = interpret(data, &NoMetrics).unwrap();
    assert_eq!(doc.postamble.unwrap().id, Some(3));
}

#[test]
fn failure_keeps_partial_document() {
    let data = one_font_page()
        .set_char(b'a')
        .eop()
        .bop()
        .fnt_num(0)
        .set_char(b'b')
        .op(251)
        .body();
    let (doc, err) = interpret_partial(data, &NoMetrics);
    assert!(matches!(err, Some(DviError::MalformedOpcode { opcode: 251, .. })));
    assert_eq!(doc.page_count(), 2);
    assert_eq!(doc.pages[0].text(), "a");
    assert_eq!(doc.pages[1].text(), "b");
    assert!(doc.postamble.is_none());
}

#[test]
fn failed_interpreter_stays_failed() {
    let mut interp = Interpreter::new(one_font_page().pop().body());
    assert!(interp.run().is_err());
    assert_eq!(interp.state(), InterpState::Failed);
    assert!(!interp.step().unwrap());
    assert_eq!(interp.last_opcode().map(|(_, op)| op), Some(142));
}

#[test]
fn custom_device_receives_events() {
    let data = one_font_page()
        .set_char(b'a')
        .set_rule(1, 1)
        .special(b"x")
        .eop()
        .bop()
        .eop()
        .finish();
    let mut interp = Interpreter::with_device(data, &NoMetrics, EventCounter::default());
    interp.run().unwrap();
    let counter = interp.into_device();
    assert_eq!(
        counter,
        EventCounter {
            pages: 2,
            chars: 1,
            rules: 1,
            specials: 1,
        }
    );
}

#[derive(Default)]
struct PageNumbers(Vec<i32>);

impl DviDevice for PageNumbers {
    fn begin_page(&mut self, page: &dviread_core::PageState) {
        self.0.push(page.number());
    }
}

#[test]
fn default_device_methods_are_optional() {
    let data = one_font_page().set_char(b'a').eop().bop().eop().finish();
    let mut interp = Interpreter::with_device(data, &NoMetrics, PageNumbers::default());
    interp.run().unwrap();
    assert_eq!(interp.device().0, vec![1, 2]);
    assert!(interp.into_document().pages.is_empty());
}

#[test]
fn collector_exposes_open_page() {
    let mut interp: Interpreter<'_, PageCollector> =
        Interpreter::new(one_font_page().set_char(b'q').body());
    assert!(interp.run().is_err());
    let open = interp.device().current().unwrap();
    assert_eq!(open.text(), "q");
}

#[test]
fn multi_byte_operand_forms() {
    let data = DviBuilder::new()
        .font_def_sized(2, 256, "cmr10", TEN_PT)
        .bop()
        .op(236) // fnt2 256
        .raw(&256u16.to_be_bytes())
        .op(144) // right2 -2
        .raw(&(-2i16).to_be_bytes())
        .op(159) // down3 -3
        .raw(&[0xff, 0xff, 0xfd])
        .op(129) // set2 0x141
        .raw(&0x0141u16.to_be_bytes())
        .op(135) // put3 0x10000
        .raw(&[0x01, 0x00, 0x00])
        .op(240) // xxx2
        .raw(&2u16.to_be_bytes())
        .raw(b"hi")
        .eop()
        .finish();
    let doc = interpret(data, &NoMetrics).unwrap();
    assert_eq!(doc.font(256).unwrap().name, "cmr10");
    assert_eq!(
        doc.pages[0].events,
        vec![
            Event::FontSelect { font: 256 },
            Event::Char {
                h: -2,
                v: -3,
                font: 256,
                code: 0x141,
                width: None,
                placement: Placement::Set,
            },
            Event::Char {
                h: -2,
                v: -3,
                font: 256,
                code: 0x1_0000,
                width: None,
                placement: Placement::Put,
            },
            Event::Special {
                h: -2,
                v: -3,
                payload: bytes::Bytes::from_static(b"hi"),
            },
        ]
    );
}

#[test]
fn register_operands_sign_extend() {
    let data = one_font_page()
        .op(150) // w3 -256
        .raw(&[0xff, 0xff, 0x00])
        .op(154) // x2 5
        .raw(&[0x00, 0x05])
        .op(164) // y3 -10
        .raw(&[0xff, 0xff, 0xf6])
        .op(170) // z4 -20
        .i32(-20)
        .op(147) // w0
        .set_char(b'x')
        .eop()
        .finish();
    let doc = interpret(data, &NoMetrics).unwrap();
    let Event::Char { h, v, .. } = doc.pages[0].events[1] else {
        panic!("expected a char event");
    };
    assert_eq!((h, v), (-256 + 5 - 256, -10 - 20));
}

#[test]
fn page_after_postamble_is_unexpected() {
    let mut data = one_font_page().set_char(b'a').eop().finish();
    let id_at = data.iter().rposition(|&b| b != 223).unwrap();
    let post_post_at = id_at - 5;
    data.insert(post_post_at, 139);

    let err = run_err(data);
    assert!(matches!(
        err,
        DviError::UnexpectedOpcode { offset, opcode: 139 } if offset == post_post_at
    ));
}
