// ============================================================================
// DISPATCH TABLE — keyword → parser for each script command
// ============================================================================
//
// A parser receives the tokens after the keyword plus the cursor, checks the
// token count, parses each value, substitutes omitted image/layer names from
// the cursor, and returns a validated `Command`.

use std::str::FromStr;

use crate::codec::ImageFormat;
use crate::command::{Command, Cursor, ImageSource, LayeredSource, Target};
use crate::error::{Error, Result, ensure};
use crate::mutator::MutatorKind;

type Parser = fn(&[&str], &Cursor) -> Result<Command>;

const DISPATCH: &[(&str, Parser)] = &[
    ("create-image", parse_create_image),
    ("create-layered-image", parse_create_layered_image),
    ("update-color", parse_update_color),
    ("apply-mutator", parse_apply_mutator),
    ("save", parse_save),
    ("save-layered", parse_save_layered),
    ("save-as-image", parse_save_as_image),
    ("load", parse_load),
    ("set-current-layer", parse_set_current_layer),
    ("add-layer", parse_add_layer),
    ("copy-layer", parse_copy_layer),
    ("add-image-as-layer", parse_add_image_as_layer),
    ("move-layer", parse_move_layer),
    ("remove-layer", parse_remove_layer),
    ("update-visibility", parse_update_visibility),
];

/// Every keyword the table understands, in table order.
pub fn keywords() -> impl Iterator<Item = &'static str> {
    DISPATCH.iter().map(|(k, _)| *k)
}

/// Parse a tokenized line (`tokens[0]` is the keyword).
pub fn parse(tokens: &[&str], cursor: &Cursor) -> Result<Command> {
    let Some((keyword, args)) = tokens.split_first() else {
        return Err(Error::invalid("empty command"));
    };
    ensure!(
        tokens.iter().all(|t| !t.is_empty()),
        "command contains an empty token"
    );
    let parser = DISPATCH
        .iter()
        .find(|(k, _)| k == keyword)
        .map(|(_, p)| *p)
        .ok_or_else(|| Error::invalid(format!("unsupported command '{}'", keyword)))?;
    parser(args, cursor)
}

/// Split `line` on whitespace and parse it.
pub fn parse_line(line: &str, cursor: &Cursor) -> Result<Command> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    parse(&tokens, cursor)
}

// ============================================================================
// TOKEN HELPERS
// ============================================================================

fn arity(keyword: &str, expected: &str, got: usize) -> Error {
    Error::invalid(format!(
        "{} expects {} argument(s), got {}",
        keyword, expected, got
    ))
}

fn number<T: FromStr>(token: &str, what: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| Error::invalid(format!("{} '{}' is not a valid number", what, token)))
}

fn index(token: &str, what: &str) -> Result<usize> {
    token.parse().map_err(|_| {
        Error::invalid(format!(
            "{} '{}' is not a non-negative integer",
            what, token
        ))
    })
}

fn rgb(tokens: &[&str]) -> Result<[i64; 3]> {
    Ok([
        number(tokens[0], "red")?,
        number(tokens[1], "green")?,
        number(tokens[2], "blue")?,
    ])
}

fn visibility(token: &str) -> Result<bool> {
    match token.to_lowercase().as_str() {
        "visible" | "true" => Ok(true),
        "invisible" | "false" => Ok(false),
        _ => Err(Error::invalid(format!(
            "visibility must be visible or invisible, got '{}'",
            token
        ))),
    }
}

/// 0 names → current layer of the current image, 1 → single image,
/// 2 → named layer of a named layered image.
fn target(names: &[&str], cursor: &Cursor) -> Result<Target> {
    match names {
        [] => Ok(Target::Layer {
            image: cursor.require_image()?.to_string(),
            layer: cursor.require_layer()?.to_string(),
        }),
        [image] => Ok(Target::Graph(image.to_string())),
        [image, layer] => Ok(Target::Layer {
            image: image.to_string(),
            layer: layer.to_string(),
        }),
        _ => Err(Error::invalid("too many image names")),
    }
}

/// `[<image>] rest...` where `rest` has exactly `fixed` tokens.
fn image_and_rest<'a>(
    keyword: &str,
    args: &'a [&'a str],
    fixed: usize,
    cursor: &'a Cursor,
) -> Result<(&'a str, &'a [&'a str])> {
    if args.len() == fixed {
        Ok((cursor.require_image()?, args))
    } else if args.len() == fixed + 1 {
        Ok((args[0], &args[1..]))
    } else {
        Err(arity(keyword, &format!("{} or {}", fixed, fixed + 1), args.len()))
    }
}

// ============================================================================
// PARSERS
// ============================================================================

fn parse_create_image(args: &[&str], _: &Cursor) -> Result<Command> {
    const KW: &str = "create-image";
    let Some((&kind, rest)) = args.split_first() else {
        return Err(arity(KW, "at least 2", 0));
    };
    match (kind, rest) {
        ("checkerboard", [name, size, count, colors @ ..]) if colors.len() == 6 => {
            Command::checkerboard(
                name,
                index(size, "tile size")?,
                index(count, "tile count")?,
                rgb(&colors[..3])?,
                rgb(&colors[3..])?,
            )
        }
        ("checkerboard", _) => Err(arity(KW, "10", args.len())),
        ("empty", [name]) => Command::create_image(name, ImageSource::Empty),
        ("empty", _) => Err(arity(KW, "2", args.len())),
        ("transparent", [name, w, h]) => Command::create_image(
            name,
            ImageSource::Transparent {
                width: index(w, "width")?,
                height: index(h, "height")?,
            },
        ),
        ("transparent", _) => Err(arity(KW, "4", args.len())),
        ("copy", [name, source]) => Command::create_image(
            name,
            ImageSource::Copy {
                source: source.to_string(),
            },
        ),
        ("copy", _) => Err(arity(KW, "3", args.len())),
        ("from-file", [name, path]) => {
            Command::create_image(name, ImageSource::File { path: path.into() })
        }
        ("from-file", _) => Err(arity(KW, "3", args.len())),
        _ => Err(Error::invalid(format!(
            "unknown image source '{}' (expected checkerboard, empty, transparent, copy or from-file)",
            kind
        ))),
    }
}

fn parse_create_layered_image(args: &[&str], _: &Cursor) -> Result<Command> {
    const KW: &str = "create-layered-image";
    match args {
        ["blank", name, w, h] => Command::create_layered_image(
            name,
            LayeredSource::Blank {
                width: index(w, "width")?,
                height: index(h, "height")?,
            },
        ),
        ["import", name, dir] => {
            Command::create_layered_image(name, LayeredSource::Import { dir: dir.into() })
        }
        ["blank", ..] => Err(arity(KW, "4", args.len())),
        ["import", ..] => Err(arity(KW, "3", args.len())),
        [kind, ..] => Err(Error::invalid(format!(
            "unknown layered image source '{}' (expected blank or import)",
            kind
        ))),
        [] => Err(arity(KW, "at least 3", 0)),
    }
}

fn parse_update_color(args: &[&str], cursor: &Cursor) -> Result<Command> {
    ensure!(
        (6..=8).contains(&args.len()),
        "update-color expects 6 to 8 argument(s), got {}",
        args.len()
    );
    let (names, values) = args.split_at(args.len() - 6);
    let target = target(names, cursor)?;
    Command::update_color(
        target,
        index(values[0], "x")?,
        index(values[1], "y")?,
        [
            number(values[2], "red")?,
            number(values[3], "green")?,
            number(values[4], "blue")?,
            number(values[5], "opacity")?,
        ],
    )
}

fn parse_apply_mutator(args: &[&str], cursor: &Cursor) -> Result<Command> {
    let Some((kind, names)) = args.split_first() else {
        return Err(arity("apply-mutator", "1 to 3", 0));
    };
    ensure!(
        names.len() <= 2,
        "apply-mutator expects 1 to 3 argument(s), got {}",
        args.len()
    );
    let mutator: MutatorKind = kind.parse()?;
    Command::apply_mutator(target(names, cursor)?, mutator)
}

fn parse_save(args: &[&str], cursor: &Cursor) -> Result<Command> {
    ensure!(
        (2..=4).contains(&args.len()),
        "save expects 2 to 4 argument(s), got {}",
        args.len()
    );
    let (names, rest) = args.split_at(args.len() - 2);
    let format: ImageFormat = rest[0].parse()?;
    Command::save(target(names, cursor)?, format, rest[1])
}

fn parse_save_layered(args: &[&str], cursor: &Cursor) -> Result<Command> {
    let (image, rest) = image_and_rest("save-layered", args, 1, cursor)?;
    Command::save_layered(image, rest[0])
}

fn parse_save_as_image(args: &[&str], cursor: &Cursor) -> Result<Command> {
    let (image, rest) = image_and_rest("save-as-image", args, 2, cursor)?;
    let format: ImageFormat = rest[0].parse()?;
    Command::save_as_image(image, format, rest[1])
}

fn parse_load(args: &[&str], _: &Cursor) -> Result<Command> {
    match args {
        [image] => Command::load(image),
        _ => Err(arity("load", "1", args.len())),
    }
}

fn parse_set_current_layer(args: &[&str], cursor: &Cursor) -> Result<Command> {
    let (image, rest) = image_and_rest("set-current-layer", args, 1, cursor)?;
    Command::set_current_layer(image, rest[0])
}

fn parse_add_layer(args: &[&str], cursor: &Cursor) -> Result<Command> {
    let (image, rest) = image_and_rest("add-layer", args, 1, cursor)?;
    Command::add_layer(image, rest[0])
}

fn parse_copy_layer(args: &[&str], cursor: &Cursor) -> Result<Command> {
    let (image, rest) = image_and_rest("copy-layer", args, 2, cursor)?;
    Command::copy_layer(image, rest[0], rest[1])
}

fn parse_add_image_as_layer(args: &[&str], cursor: &Cursor) -> Result<Command> {
    let (image, rest) = image_and_rest("add-image-as-layer", args, 2, cursor)?;
    Command::add_image_as_layer(image, rest[0], rest[1])
}

fn parse_move_layer(args: &[&str], cursor: &Cursor) -> Result<Command> {
    let (image, rest) = image_and_rest("move-layer", args, 2, cursor)?;
    Command::move_layer(image, rest[0], index(rest[1], "layer index")?)
}

fn parse_remove_layer(args: &[&str], cursor: &Cursor) -> Result<Command> {
    let (image, rest) = image_and_rest("remove-layer", args, 1, cursor)?;
    Command::remove_layer(image, rest[0])
}

fn parse_update_visibility(args: &[&str], cursor: &Cursor) -> Result<Command> {
    match args {
        [flag] => Command::update_visibility(
            cursor.require_image()?,
            cursor.require_layer()?,
            visibility(flag)?,
        ),
        [layer, flag] => {
            Command::update_visibility(cursor.require_image()?, layer, visibility(flag)?)
        }
        [image, layer, flag] => Command::update_visibility(image, layer, visibility(flag)?),
        _ => Err(arity("update-visibility", "1 to 3", args.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Pixel;

    fn cursor(image: Option<&str>, layer: Option<&str>) -> Cursor {
        let mut c = Cursor::default();
        c.set(image.map(String::from), layer.map(String::from));
        c
    }

    fn ok(line: &str) -> Command {
        parse_line(line, &cursor(Some("cur"), Some("top"))).unwrap()
    }

    fn bad(line: &str) {
        let err = parse_line(line, &cursor(Some("cur"), Some("top"))).unwrap_err();
        assert!(err.is_invalid_argument(), "{}: {}", line, err);
    }

    #[test]
    fn every_keyword_is_unique() {
        let mut seen: Vec<&str> = keywords().collect();
        let total = seen.len();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), total);
        assert_eq!(total, 15);
    }

    #[test]
    fn empty_and_unknown_lines_fail() {
        bad("");
        bad("   ");
        bad("frobnicate x");
        assert!(parse(&["load", ""], &Cursor::default()).is_err());
    }

    #[test]
    fn create_image_variants() {
        assert_eq!(
            ok("create-image checkerboard board 1 4 255 0 0 0 0 0"),
            Command::CreateImage {
                name: "board".into(),
                source: ImageSource::Checkerboard {
                    tile_size: 1,
                    tile_count: 4,
                    first: Pixel::opaque(255, 0, 0),
                    second: Pixel::opaque(0, 0, 0),
                },
            }
        );
        assert_eq!(
            ok("create-image empty e"),
            Command::create_image("e", ImageSource::Empty).unwrap()
        );
        assert_eq!(
            ok("create-image transparent t 3 2"),
            Command::create_image("t", ImageSource::Transparent { width: 3, height: 2 }).unwrap()
        );
        bad("create-image checkerboard board 1 4 255 0 0 0 0");
        bad("create-image checkerboard board 1 5 255 0 0 0 0 0");
        bad("create-image transparent t 3");
        bad("create-image transparent t -3 2");
        bad("create-image transparent t three 2");
        bad("create-image empty e extra");
        bad("create-image spiral s");
        bad("create-image");
    }

    #[test]
    fn update_color_resolves_targets_by_name_count() {
        assert_eq!(
            ok("update-color 1 2 3 4 5 6"),
            Command::update_color(
                Target::Layer { image: "cur".into(), layer: "top".into() },
                1,
                2,
                [3, 4, 5, 6]
            )
            .unwrap()
        );
        assert_eq!(
            ok("update-color pic 0 0 0 0 0 0"),
            Command::update_color(Target::Graph("pic".into()), 0, 0, [0; 4]).unwrap()
        );
        assert_eq!(
            ok("update-color img bg 0 0 0 0 0 0"),
            Command::update_color(
                Target::Layer { image: "img".into(), layer: "bg".into() },
                0,
                0,
                [0; 4]
            )
            .unwrap()
        );
        bad("update-color 0 0 0 0 0");
        bad("update-color a b c 0 0 0 0 0 0");
        bad("update-color pic -1 0 0 0 0 0");
        bad("update-color pic 0 0 0 0 0 256");
        bad("update-color pic 0 0 x 0 0 0");
    }

    #[test]
    fn omitted_names_need_a_cursor() {
        let empty = Cursor::default();
        assert!(parse_line("update-color 0 0 0 0 0 0", &empty).is_err());
        assert!(parse_line("add-layer bg", &empty).is_err());
        assert!(parse_line("update-visibility invisible", &cursor(Some("img"), None)).is_err());
        assert!(parse_line("add-layer img bg", &empty).is_ok());
    }

    #[test]
    fn apply_mutator_and_save_forms() {
        assert_eq!(
            ok("apply-mutator sepia"),
            Command::apply_mutator(
                Target::Layer { image: "cur".into(), layer: "top".into() },
                MutatorKind::Sepia
            )
            .unwrap()
        );
        assert_eq!(
            ok("apply-mutator blur pic"),
            Command::apply_mutator(Target::Graph("pic".into()), MutatorKind::Blur).unwrap()
        );
        bad("apply-mutator emboss pic");
        bad("apply-mutator blur a b c");
        bad("apply-mutator");

        assert_eq!(
            ok("save pic png out.png"),
            Command::save(Target::Graph("pic".into()), ImageFormat::Png, "out.png").unwrap()
        );
        assert_eq!(ok("save img bg jpeg out.jpg").keyword(), "save");
        bad("save pic gif out.gif");
        bad("save out.png");
    }

    #[test]
    fn layer_commands_substitute_the_current_image() {
        assert_eq!(ok("add-layer bg"), Command::add_layer("cur", "bg").unwrap());
        assert_eq!(ok("add-layer img bg"), Command::add_layer("img", "bg").unwrap());
        assert_eq!(ok("copy-layer b a"), Command::copy_layer("cur", "b", "a").unwrap());
        assert_eq!(ok("move-layer img bg 0"), Command::move_layer("img", "bg", 0).unwrap());
        assert_eq!(ok("remove-layer bg"), Command::remove_layer("cur", "bg").unwrap());
        assert_eq!(
            ok("set-current-layer img bg"),
            Command::set_current_layer("img", "bg").unwrap()
        );
        assert_eq!(ok("save-layered out"), Command::save_layered("cur", "out").unwrap());
        assert_eq!(
            ok("save-as-image ppm flat.ppm"),
            Command::save_as_image("cur", ImageFormat::Ppm, "flat.ppm").unwrap()
        );
        bad("move-layer bg -1");
        bad("add-layer a b c");
        bad("load");
        bad("load a b");
    }

    #[test]
    fn update_visibility_forms() {
        assert_eq!(
            ok("update-visibility invisible"),
            Command::update_visibility("cur", "top", false).unwrap()
        );
        assert_eq!(
            ok("update-visibility bg true"),
            Command::update_visibility("cur", "bg", true).unwrap()
        );
        assert_eq!(
            ok("update-visibility img bg VISIBLE"),
            Command::update_visibility("img", "bg", true).unwrap()
        );
        bad("update-visibility img bg maybe");
        bad("update-visibility");
    }
}
