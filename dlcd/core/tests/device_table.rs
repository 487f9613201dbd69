use dlcd_core::{strobe, CoreError, DeviceTable, FrameCapture, PhysicalRange, Result};

fn table() -> DeviceTable<FrameCapture> {
    DeviceTable::new(PhysicalRange::default())
}

fn send(table: &mut DeviceTable<FrameCapture>, base: u64, rs: bool, byte: u8) {
    for (offset, value) in strobe(rs, byte) {
        table.write32(0, base + offset, value);
    }
}

fn send_text(table: &mut DeviceTable<FrameCapture>, base: u64, text: &str) {
    for byte in text.bytes() {
        send(table, base, true, byte);
    }
}

#[test]
fn devices_only_see_their_own_register_block() -> Result<()> {
    let mut table = table();
    table.attach(&["top", "2", "16", "0x1000"], FrameCapture::new())?;
    table.attach(&["bottom", "4", "20", "0x2000"], FrameCapture::new())?;

    send(&mut table, 0x1000, false, 0x0C);
    send_text(&mut table, 0x1000, "upper");
    send(&mut table, 0x2000, false, 0x38);
    send(&mut table, 0x2000, false, 0x0C);
    send_text(&mut table, 0x2000, "lower");

    let top = table.get("top").expect("top attached");
    let bottom = table.get("bottom").expect("bottom attached");
    assert_eq!(top.text_lines(), vec!["upper", ""]);
    assert_eq!(bottom.text_lines(), vec!["lower", "", "", ""]);
    assert_eq!(top.sink().len(), 6);
    assert_eq!(bottom.sink().len(), 7);
    Ok(())
}

#[test]
fn independent_geometry_and_mode() -> Result<()> {
    let mut table = table();
    table.attach(&["a", "1", "8", "0x100"], FrameCapture::new())?;
    table.attach(&["b", "2", "40", "0x200"], FrameCapture::new())?;
    send(&mut table, 0x200, false, 0x38);

    let a = table.get("a").expect("a attached");
    let b = table.get("b").expect("b attached");
    assert!(!a.lcd().multi_line());
    assert!(b.lcd().multi_line());
    assert_eq!(a.lcd().buffer().len(), 8);
    assert_eq!(b.lcd().buffer().len(), 80);
    Ok(())
}

#[test]
fn adjacent_blocks_do_not_alias() -> Result<()> {
    let mut table = table();
    table.attach(&["first", "1", "4", "0x40"], FrameCapture::new())?;
    table.attach(&["second", "1", "4", "0x44"], FrameCapture::new())?;
    send_text(&mut table, 0x44, "ab");

    assert!(table.get("first").expect("first").lcd().buffer().is_blank());
    assert_eq!(table.get("second").expect("second").lcd().buffer().row(0), b"ab\0\0");
    Ok(())
}

#[test]
fn init_rejects_bad_parameters() {
    let mut table = table();
    let cases: [&[&str]; 6] = [
        &["lcd"],
        &["lcd", "0", "16", "0x100"],
        &["lcd", "2", "41", "0x100"],
        &["lcd", "2", "16", "banana"],
        &["lcd", "2", "16", "0x100", "extra"],
        &["lcd", "2", "16", "0xFFFFFFFFE"],
    ];
    for tokens in cases {
        assert!(
            table.attach(tokens, FrameCapture::new()).is_err(),
            "{tokens:?} should fail"
        );
    }
    assert!(table.is_empty());
}

#[test]
fn register_block_must_fit_below_the_limit() {
    let mut table: DeviceTable<FrameCapture> = DeviceTable::new(PhysicalRange::new(0x1000));
    assert!(matches!(
        table.attach(&["lcd", "2", "16", "0xFFC"], FrameCapture::new()),
        Err(CoreError::RegisterBlockOverflow(0xFFC))
    ));
    assert!(table.attach(&["lcd", "2", "16", "0xFFB"], FrameCapture::new()).is_ok());
}

#[test]
fn teardown_returns_sinks_in_registration_order() -> Result<()> {
    let mut table = table();
    table.attach(&["one", "1", "4", "0x10"], FrameCapture::new())?;
    table.attach(&["two", "1", "4", "0x20"], FrameCapture::new())?;
    send_text(&mut table, 0x20, "x");

    let sinks = table.teardown();
    assert_eq!(sinks.len(), 2);
    assert!(sinks[0].is_empty());
    assert_eq!(sinks[1].len(), 1);
    Ok(())
}
