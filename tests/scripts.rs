// End-to-end runs of whole scripts through the interpreter and the shell.

use std::fs;
use std::path::Path;

use pixelgraph::{Interpreter, Pixel, Shell, WorkspaceOptions};
use tempfile::TempDir;

fn run_all(interp: &mut Interpreter, lines: &[String]) {
    for line in lines {
        if let Err(e) = interp.run_line(line) {
            panic!("'{}' failed: {}", line, e);
        }
    }
}

fn p(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn close(a: u8, b: u8, tolerance: u8) -> bool {
    a.abs_diff(b) <= tolerance
}

#[test]
fn cursor_scenario_from_a_fresh_session() {
    let mut interp = Interpreter::default();
    interp.run_line("create-layered-image blank imgA 3 3").unwrap();
    interp.run_line("add-layer imgA paint").unwrap();

    let edit = "update-color 2 1 1 2 3 4";
    assert!(interp.run_line(edit).unwrap_err().is_invalid_argument());
    interp.run_line("load imgA").unwrap();
    interp.run_line(edit).unwrap();

    let layer = interp.workspace().layered("imgA").unwrap().layer("paint").unwrap();
    assert_eq!(layer.pixels().pixel(2, 1).unwrap(), Pixel::new(1, 2, 3, 4));
}

#[test]
fn raster_formats_round_trip() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let mut interp = Interpreter::default();
    // 16-pixel tiles line up with JPEG MCUs, so every block is flat.
    run_all(
        &mut interp,
        &[
            "create-image checkerboard board 16 4 200 30 40 20 180 90".to_string(),
            format!("save board ppm {}", p(&dir.join("b.ppm"))),
            format!("save board png {}", p(&dir.join("b.png"))),
            format!("save board jpeg {}", p(&dir.join("b.jpeg"))),
            format!("create-image from-file fromppm {}", p(&dir.join("b.ppm"))),
            format!("create-image from-file frompng {}", p(&dir.join("b.png"))),
            format!("create-image from-file fromjpeg {}", p(&dir.join("b.jpeg"))),
        ],
    );

    let ppm_text = fs::read_to_string(dir.join("b.ppm")).unwrap();
    assert!(ppm_text.starts_with("P3"));

    let ws = interp.workspace();
    let board = ws.graph("board").unwrap();
    assert_eq!(ws.graph("fromppm").unwrap(), board);
    assert_eq!(ws.graph("frompng").unwrap(), board);

    let jpeg = ws.graph("fromjpeg").unwrap();
    assert_eq!((jpeg.width(), jpeg.height()), (32, 32));
    for (a, b) in board.pixels().iter().zip(jpeg.pixels()) {
        assert!(
            close(a.red, b.red, 21) && close(a.green, b.green, 21) && close(a.blue, b.blue, 21),
            "{:?} vs {:?}",
            a,
            b
        );
        assert_eq!(b.opacity, 255);
    }
}

#[test]
fn png_keeps_opacity_and_ppm_drops_it() {
    let tmp = TempDir::new().unwrap();
    let mut interp = Interpreter::default();
    run_all(
        &mut interp,
        &[
            "create-image transparent t 2 2".to_string(),
            "update-color t 1 0 10 20 30 40".to_string(),
            format!("save t png {}", p(&tmp.path().join("t.png"))),
            format!("save t ppm {}", p(&tmp.path().join("t.ppm"))),
            format!("create-image from-file a {}", p(&tmp.path().join("t.png"))),
            format!("create-image from-file b {}", p(&tmp.path().join("t.ppm"))),
        ],
    );
    let ws = interp.workspace();
    assert_eq!(ws.graph("a").unwrap().pixel(1, 0).unwrap(), Pixel::new(10, 20, 30, 40));
    assert_eq!(ws.graph("b").unwrap().pixel(1, 0).unwrap(), Pixel::opaque(10, 20, 30));
    assert_eq!(ws.graph("b").unwrap().pixel(0, 0).unwrap(), Pixel::opaque(0, 0, 0));
}

#[test]
fn layered_image_survives_save_and_import() {
    let tmp = TempDir::new().unwrap();
    let stack = tmp.path().join("stack");
    let mut interp = Interpreter::default();
    run_all(
        &mut interp,
        &[
            "create-layered-image blank art 4 4".to_string(),
            "load art".to_string(),
            "add-layer sky".to_string(),
            "add-layer sun".to_string(),
            "copy-layer glow sun".to_string(),
            "set-current-layer sun".to_string(),
            "update-color 1 1 255 200 0 255".to_string(),
            "update-visibility glow invisible".to_string(),
            "move-layer glow 2".to_string(),
            format!("save-layered {}", p(&stack)),
            format!("create-layered-image import copy {}", p(&stack)),
        ],
    );

    let ws = interp.workspace();
    let original = ws.layered("art").unwrap();
    let copy = ws.layered("copy").unwrap();
    assert_eq!(copy.layer_names(), vec!["sun", "sky", "glow"]);
    assert_eq!(copy, original);
    assert!(!copy.visibility("glow").unwrap());
    assert_eq!(
        copy.layer("sun").unwrap().pixels().pixel(1, 1).unwrap(),
        Pixel::opaque(255, 200, 0)
    );
}

#[test]
fn save_as_image_flattens_visible_layers() {
    let tmp = TempDir::new().unwrap();
    let flat = tmp.path().join("flat.png");
    let mut interp = Interpreter::default();
    run_all(
        &mut interp,
        &[
            "create-layered-image blank img 1 1".to_string(),
            "load img".to_string(),
            "add-layer blue".to_string(),
            "add-layer red".to_string(),
            "add-layer hidden".to_string(),
            "update-color img blue 0 0 0 0 255 255".to_string(),
            "update-color img red 0 0 255 0 0 255".to_string(),
            "update-color img hidden 0 0 0 255 0 255".to_string(),
            "update-visibility img hidden false".to_string(),
            format!("save-as-image png {}", p(&flat)),
            format!("create-image from-file out {}", p(&flat)),
        ],
    );
    assert_eq!(
        interp.workspace().graph("out").unwrap().pixel(0, 0).unwrap(),
        Pixel::opaque(255, 0, 0)
    );
}

#[test]
fn mutators_apply_to_single_images_and_layers() {
    let mut interp = Interpreter::default();
    run_all(
        &mut interp,
        &[
            "create-image transparent g 1 1".to_string(),
            "update-color g 0 0 55 111 222 90".to_string(),
            "create-image copy s g".to_string(),
            "apply-mutator greyscale g".to_string(),
            "apply-mutator sepia s".to_string(),
            "create-layered-image blank l 1 1".to_string(),
            "add-layer l only".to_string(),
            "update-color l only 0 0 55 111 222 255".to_string(),
            "load l".to_string(),
            "apply-mutator greyscale".to_string(),
        ],
    );
    let ws = interp.workspace();
    assert_eq!(ws.graph("g").unwrap().pixel(0, 0).unwrap(), Pixel::new(107, 107, 107, 90));
    assert_eq!(ws.graph("s").unwrap().pixel(0, 0).unwrap(), Pixel::new(149, 133, 103, 90));
    assert_eq!(
        ws.layered("l").unwrap().layer("only").unwrap().pixels().pixel(0, 0).unwrap(),
        Pixel::opaque(107, 107, 107)
    );
}

#[test]
fn shell_reports_lines_and_keeps_going() {
    let tmp = TempDir::new().unwrap();
    let script = format!(
        "# build a board\n\
         create-image checkerboard b 1 4 255 0 0 0 0 0\n\
         \n\
         save b bmp {out}\n\
         save b png {out}\n\
         exit\n\
         create-image empty never\n",
        out = p(&tmp.path().join("b.png"))
    );

    let mut shell = Shell::new(Interpreter::default(), Vec::new());
    let summary = shell.run(script.as_bytes()).unwrap();
    shell.quit().unwrap();
    let (interp, out) = shell.into_parts();
    let out = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = out.lines().collect();

    assert_eq!(lines.len(), 4, "{}", out);
    assert_eq!(lines[0], "Line 2: create-image done");
    assert!(lines[1].starts_with("Invalid line 4: "));
    assert_eq!(lines[2], "Line 5: save done");
    assert_eq!(lines[3], "Image Processor Quit");
    assert!(summary.quit);
    assert_eq!(summary.failed, 1);
    assert!(interp.workspace().graph("never").is_err());
    assert!(tmp.path().join("b.png").is_file());
}

#[test]
fn dimension_limit_applies_to_decoded_files() {
    let tmp = TempDir::new().unwrap();
    let big = tmp.path().join("big.png");
    let mut writer = Interpreter::default();
    run_all(
        &mut writer,
        &[
            "create-image transparent big 20 5".to_string(),
            format!("save big png {}", p(&big)),
        ],
    );

    let mut limited = Interpreter::new(WorkspaceOptions {
        max_dimension: 16,
        ..WorkspaceOptions::default()
    });
    let err = limited
        .run_line(&format!("create-image from-file big {}", p(&big)))
        .unwrap_err();
    assert!(err.is_invalid_argument());
    assert!(limited.workspace().graphs().is_empty());
}
