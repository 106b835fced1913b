//! Canonical 68-landmark face topology.
//!
//! Landmark indices follow the standard 68-point annotation scheme:
//! jaw 0..=16, right brow 17..=21, left brow 22..=26, nose bridge 27..=30,
//! nose base 31..=35, right eye 36..=41, left eye 42..=47, outer lips
//! 48..=59, inner lips 60..=67. Mesh backends that regress this scheme share
//! the edge groups defined here.

pub const LANDMARK_COUNT: usize = 68;

/// Open polyline regions (consecutive points connected, ends free).
const CHAINS: &[(u16, u16)] = &[
    (0, 16),  // jaw
    (17, 21), // right brow
    (22, 26), // left brow
    (27, 30), // nose bridge
    (31, 35), // nose base
];

/// Closed loop regions (consecutive points connected, last back to first).
const LOOPS: &[(u16, u16)] = &[
    (36, 41), // right eye
    (42, 47), // left eye
    (48, 59), // outer lips
    (60, 67), // inner lips
];

/// Contour outline edges: the region polylines and loops.
pub fn contour_edges() -> Vec<[u16; 2]> {
    let mut edges = Vec::new();
    for &(start, end) in CHAINS {
        for i in start..end {
            edges.push([i, i + 1]);
        }
    }
    for &(start, end) in LOOPS {
        for i in start..end {
            edges.push([i, i + 1]);
        }
        edges.push([end, start]);
    }
    edges
}

/// Fine tessellation edges: the contour edges plus skip-one links inside
/// every region and a fixed set of cross-region stitches, giving the dense
/// net drawn underneath the outline.
pub fn tessellation_edges() -> Vec<[u16; 2]> {
    let mut edges = contour_edges();
    for &(start, end) in CHAINS.iter().chain(LOOPS.iter()) {
        for i in start..end.saturating_sub(1) {
            edges.push([i, i + 2]);
        }
    }
    // Stitches linking regions into one surface.
    const STITCHES: &[[u16; 2]] = &[
        [17, 36], // brow to eye corners
        [21, 39],
        [22, 42],
        [26, 45],
        [21, 27], // brows to nose bridge
        [22, 27],
        [30, 31], // bridge to base
        [31, 48], // nose to mouth corners
        [35, 54],
        [39, 27], // eyes to bridge
        [42, 27],
        [3, 48],  // jaw to mouth
        [13, 54],
        [8, 57],  // chin to lower lip
        [0, 17],  // jaw ends to brows
        [16, 26],
        [48, 60], // lip loops
        [54, 64],
    ];
    edges.extend_from_slice(STITCHES);
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_edges_stay_in_range() {
        for edge in contour_edges().iter().chain(tessellation_edges().iter()) {
            assert!((edge[0] as usize) < LANDMARK_COUNT);
            assert!((edge[1] as usize) < LANDMARK_COUNT);
        }
    }

    #[test]
    fn contours_are_a_subset_of_tessellation() {
        let tess = tessellation_edges();
        for edge in contour_edges() {
            assert!(tess.contains(&edge), "missing contour edge {:?}", edge);
        }
    }

    #[test]
    fn eye_loops_close() {
        let contours = contour_edges();
        assert!(contours.contains(&[41, 36]));
        assert!(contours.contains(&[47, 42]));
    }

    #[test]
    fn tessellation_is_denser_than_contours() {
        assert!(tessellation_edges().len() > contour_edges().len());
    }
}
