//! The viewer layout sent alongside the replay.

use rerun::blueprint::{Blueprint, Grid, MapView, Spatial3DView, TextDocumentView, TimePanel};
use rerun::external::re_sdk_types::blueprint::components::PanelState;

/// Markdown shown in the description view.
pub const DESCRIPTION: &str = "\
# ROS TF Example

ROS 2 tracks coordinate frames over time with the transform library,
[tf2](https://docs.ros.org/en/jazzy/Concepts/Intermediate/About-Tf2.html):
points, vectors, and poses can be converted between any two frames of the
tree (say from `camera_link` to `base_link`) without the producers of those
frames knowing about each other. Rerun's
[named transforms](https://rerun.io/docs/concepts/logging-and-ingestion/transforms#named-transform-frames)
carry the same idea, decoupling spatial relationships from the entity
hierarchy.

This example replays a recorded drive through its transform tree. Every
transform sample is also drawn as an arrow between its frame pair, which
makes it easy to spot where the tree is broken when transforms do not
behave as expected.
";

/// A 2x2 grid: the main 3D view, the description, a top-down 3D view
/// following the corrected GPS frame, and a map of the GPS track. The time
/// panel starts collapsed.
pub fn blueprint() -> Blueprint {
    let grid = Grid::new(vec![
        Spatial3DView::new("3D View")
            .with_origin("/")
            .with_contents(["+ /**"])
            .into(),
        TextDocumentView::new("Description")
            .with_origin("description")
            .into(),
        Spatial3DView::new("Top Down 3D View")
            .with_origin("/")
            .with_contents(["+ /**"])
            .into(),
        MapView::new("Map View").into(),
    ]);

    Blueprint::new(grid).with_time_panel(TimePanel::new().with_state(PanelState::Collapsed))
}
