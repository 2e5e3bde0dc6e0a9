// ============================================================================
// PIXEL NODES — colour values and cursors into a PixelGraph mesh
// ============================================================================
//
// A graph stores plain `Pixel` values in a flat row-major arena. The four
// neighbour links of the mesh are computed from (x, y) on demand: a step that
// leaves the grid lands on `Node::Empty`, the boundary sentinel whose reads
// are all zero and whose writes do nothing.

use crate::graph::PixelGraph;

/// Round half-up and saturate to a colour channel.
/// `0.5 → 1`, `-3.2 → 0`, `300.0 → 255`.
#[inline]
pub(crate) fn channel_from_f64(v: f64) -> u8 {
    (v + 0.5).floor().clamp(0.0, 255.0) as u8
}

#[inline]
fn clamp_channel(v: i64) -> u8 {
    v.clamp(0, 255) as u8
}

// ============================================================================
// PIXEL VALUE
// ============================================================================

/// RGB colour plus opacity, each in `[0, 255]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Pixel {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub opacity: u8,
}

impl Pixel {
    /// Default colour of inserted rows and columns.
    pub const WHITE: Pixel = Pixel::new(255, 255, 255, 255);
    /// Zero colour, zero opacity. Also what the `Empty` sentinel reads as.
    pub const TRANSPARENT: Pixel = Pixel::new(0, 0, 0, 0);

    pub const fn new(red: u8, green: u8, blue: u8, opacity: u8) -> Self {
        Self { red, green, blue, opacity }
    }

    pub const fn opaque(red: u8, green: u8, blue: u8) -> Self {
        Self::new(red, green, blue, 255)
    }

    /// Build a pixel from arbitrary integers, saturating each channel.
    pub fn clamped(red: i64, green: i64, blue: i64, opacity: i64) -> Self {
        Self::new(
            clamp_channel(red),
            clamp_channel(green),
            clamp_channel(blue),
            clamp_channel(opacity),
        )
    }

    pub fn set_opacity(&mut self, opacity: i64) {
        self.opacity = clamp_channel(opacity);
    }

    /// Overwrite all four channels (saturating).
    pub fn update_colors(&mut self, red: i64, green: i64, blue: i64, opacity: i64) {
        *self = Self::clamped(red, green, blue, opacity);
    }

    /// Overwrite the colour channels only; opacity is kept.
    pub fn edit_colors(&mut self, red: i64, green: i64, blue: i64) {
        self.red = clamp_channel(red);
        self.green = clamp_channel(green);
        self.blue = clamp_channel(blue);
    }

    pub fn rgb(&self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.red, self.green, self.blue, self.opacity]
    }

    pub fn from_rgba(rgba: [u8; 4]) -> Self {
        Self::new(rgba[0], rgba[1], rgba[2], rgba[3])
    }
}

// ============================================================================
// DIRECTIONS
// ============================================================================

/// One of the four mesh links.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Above,
    Below,
    Left,
    Right,
}

impl Direction {
    pub fn all() -> &'static [Direction] {
        &[Direction::Above, Direction::Below, Direction::Left, Direction::Right]
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Above => Direction::Below,
            Direction::Below => Direction::Above,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// (dx, dy) offset of one step; y grows downwards.
    pub fn offset(self) -> (i64, i64) {
        match self {
            Direction::Above => (0, -1),
            Direction::Below => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

/// Step from `(x, y)` by `(dx, dy)`, returning `None` when the target falls
/// outside a `width × height` grid.
#[inline]
pub(crate) fn step(
    x: usize,
    y: usize,
    dx: i64,
    dy: i64,
    width: usize,
    height: usize,
) -> Option<(usize, usize)> {
    let nx = x as i64 + dx;
    let ny = y as i64 + dy;
    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
        None
    } else {
        Some((nx as usize, ny as usize))
    }
}

// ============================================================================
// READ-ONLY NODE CURSOR
// ============================================================================

/// A node of a [`PixelGraph`]: either a live pixel at a position, or the
/// boundary sentinel.
///
/// Two nodes are equal when they are the same position of the same graph, or
/// both `Empty`.
#[derive(Clone, Copy, Debug)]
pub enum Node<'g> {
    Pixel { graph: &'g PixelGraph, x: usize, y: usize },
    Empty,
}

impl<'g> Node<'g> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Empty)
    }

    /// `(x, y)` of a live node, `None` for the sentinel.
    pub fn position(&self) -> Option<(usize, usize)> {
        match *self {
            Node::Pixel { x, y, .. } => Some((x, y)),
            Node::Empty => None,
        }
    }

    /// The stored colour, or [`Pixel::TRANSPARENT`] for the sentinel.
    pub fn color(&self) -> Pixel {
        match *self {
            Node::Pixel { graph, x, y } => graph.pixels[graph.index_of(x, y)],
            Node::Empty => Pixel::TRANSPARENT,
        }
    }

    pub fn red(&self) -> u8 {
        self.color().red
    }

    pub fn green(&self) -> u8 {
        self.color().green
    }

    pub fn blue(&self) -> u8 {
        self.color().blue
    }

    pub fn opacity(&self) -> u8 {
        self.color().opacity
    }

    /// Follow one mesh link. Stepping off the grid, or stepping from the
    /// sentinel, yields the sentinel.
    pub fn neighbor(&self, direction: Direction) -> Node<'g> {
        let (dx, dy) = direction.offset();
        self.offset(dx, dy)
    }

    /// Jump `(dx, dy)` positions away; the equivalent of following that many
    /// links, except that it never passes through the sentinel halfway.
    pub fn offset(&self, dx: i64, dy: i64) -> Node<'g> {
        match *self {
            Node::Pixel { graph, x, y } => {
                match step(x, y, dx, dy, graph.width(), graph.height()) {
                    Some((nx, ny)) => Node::Pixel { graph, x: nx, y: ny },
                    None => Node::Empty,
                }
            }
            Node::Empty => Node::Empty,
        }
    }

    pub fn above(&self) -> Node<'g> {
        self.neighbor(Direction::Above)
    }

    pub fn below(&self) -> Node<'g> {
        self.neighbor(Direction::Below)
    }

    pub fn left(&self) -> Node<'g> {
        self.neighbor(Direction::Left)
    }

    pub fn right(&self) -> Node<'g> {
        self.neighbor(Direction::Right)
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Empty, Node::Empty) => true,
            (
                Node::Pixel { graph: ga, x: xa, y: ya },
                Node::Pixel { graph: gb, x: xb, y: yb },
            ) => std::ptr::eq(*ga, *gb) && xa == xb && ya == yb,
            _ => false,
        }
    }
}

impl Eq for Node<'_> {}

// ============================================================================
// MUTABLE NODE CURSOR
// ============================================================================

/// Mutable counterpart of [`Node`]. Writes through `Empty` are silently
/// ignored, which is the sentinel contract at the grid boundary.
#[derive(Debug)]
pub enum NodeMut<'g> {
    Pixel { graph: &'g mut PixelGraph, x: usize, y: usize },
    Empty,
}

impl<'g> NodeMut<'g> {
    pub fn is_empty(&self) -> bool {
        matches!(self, NodeMut::Empty)
    }

    pub fn position(&self) -> Option<(usize, usize)> {
        match *self {
            NodeMut::Pixel { x, y, .. } => Some((x, y)),
            NodeMut::Empty => None,
        }
    }

    pub fn color(&self) -> Pixel {
        match self {
            NodeMut::Pixel { graph, x, y } => graph.pixels[graph.index_of(*x, *y)],
            NodeMut::Empty => Pixel::TRANSPARENT,
        }
    }

    fn slot(&mut self) -> Option<&mut Pixel> {
        match self {
            NodeMut::Pixel { graph, x, y } => {
                let idx = graph.index_of(*x, *y);
                Some(&mut graph.pixels[idx])
            }
            NodeMut::Empty => None,
        }
    }

    pub fn set_opacity(&mut self, opacity: i64) {
        if let Some(p) = self.slot() {
            p.set_opacity(opacity);
        }
    }

    pub fn update_colors(&mut self, red: i64, green: i64, blue: i64, opacity: i64) {
        if let Some(p) = self.slot() {
            p.update_colors(red, green, blue, opacity);
        }
    }

    pub fn edit_colors(&mut self, red: i64, green: i64, blue: i64) {
        if let Some(p) = self.slot() {
            p.edit_colors(red, green, blue);
        }
    }

    /// Move the cursor along one link.
    pub fn neighbor(self, direction: Direction) -> NodeMut<'g> {
        let (dx, dy) = direction.offset();
        match self {
            NodeMut::Pixel { graph, x, y } => {
                match step(x, y, dx, dy, graph.width(), graph.height()) {
                    Some((nx, ny)) => NodeMut::Pixel { graph, x: nx, y: ny },
                    None => NodeMut::Empty,
                }
            }
            NodeMut::Empty => NodeMut::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_rounding_is_half_up() {
        assert_eq!(channel_from_f64(0.5), 1);
        assert_eq!(channel_from_f64(1.5), 2);
        assert_eq!(channel_from_f64(2.5), 3);
        assert_eq!(channel_from_f64(2.4999), 2);
        assert_eq!(channel_from_f64(-7.0), 0);
        assert_eq!(channel_from_f64(255.6), 255);
    }

    #[test]
    fn setters_saturate_and_are_idempotent() {
        let mut p = Pixel::WHITE;
        p.set_opacity(400);
        assert_eq!(p.opacity, 255);
        p.set_opacity(400);
        assert_eq!(p.opacity, 255);
        p.set_opacity(-12);
        assert_eq!(p.opacity, 0);

        p.update_colors(-1, 256, 128, 999);
        assert_eq!(p, Pixel::new(0, 255, 128, 255));
        p.update_colors(-1, 256, 128, 999);
        assert_eq!(p, Pixel::new(0, 255, 128, 255));
    }

    #[test]
    fn edit_colors_keeps_opacity() {
        let mut p = Pixel::new(1, 2, 3, 40);
        p.edit_colors(300, 20, -5);
        assert_eq!(p, Pixel::new(255, 20, 0, 40));
    }

    #[test]
    fn sentinel_reads_zero_and_ignores_writes() {
        let empty = Node::Empty;
        assert_eq!(empty.color(), Pixel::TRANSPARENT);
        assert!(empty.left().is_empty());
        assert!(empty.above().is_empty());

        let mut sentinel = NodeMut::Empty;
        sentinel.set_opacity(200);
        sentinel.update_colors(10, 20, 30, 40);
        sentinel.edit_colors(1, 2, 3);
        assert_eq!(sentinel.color(), Pixel::TRANSPARENT);
        assert!(sentinel.neighbor(Direction::Right).is_empty());
    }

    #[test]
    fn directions_are_symmetric() {
        for &d in Direction::all() {
            let (dx, dy) = d.offset();
            let (ox, oy) = d.opposite().offset();
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
    }
}
