//! Aspect-preserving fit of an image into a field box

/// Size and placement of an image inside its field box, relative to the
/// box's lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedImage {
    pub width: f64,
    pub height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// Scale an image to fit the box, centering it on the axis with slack.
///
/// Wider-than-box images are constrained to the box width and letterboxed
/// vertically; everything else is constrained to the box height and
/// centered horizontally. Degenerate image sizes stretch to the box.
pub fn fit_in_bounds(image_width: f64, image_height: f64, box_width: f64, box_height: f64) -> FittedImage {
    if !(image_width > 0.0 && image_height > 0.0 && box_width > 0.0 && box_height > 0.0) {
        return FittedImage {
            width: box_width,
            height: box_height,
            offset_x: 0.0,
            offset_y: 0.0,
        };
    }

    let image_aspect = image_width / image_height;
    let box_aspect = box_width / box_height;

    if image_aspect > box_aspect {
        let height = box_width / image_aspect;
        FittedImage {
            width: box_width,
            height,
            offset_x: 0.0,
            offset_y: (box_height - height) / 2.0,
        }
    } else {
        let width = box_height * image_aspect;
        FittedImage {
            width,
            height: box_height,
            offset_x: (box_width - width) / 2.0,
            offset_y: 0.0,
        }
    }
}
