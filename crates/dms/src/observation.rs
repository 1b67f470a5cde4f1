//! Per-frame eye evidence and the landmark geometry behind it

use serde::{Deserialize, Serialize};

use crate::config::{ClassificationStrategy, TrackerConfig};
use crate::DmsError;

/// Number of points in the dlib 68-point face layout
pub const FACE_LANDMARK_COUNT: usize = 68;

const LEFT_EYE: std::ops::Range<usize> = 36..42;
const RIGHT_EYE: std::ops::Range<usize> = 42..48;

/// Coarse eye state from the blink ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EyeState {
    Open,
    HalfClosed,
    Closed,
}

/// One frame's evidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EyeObservation {
    /// Detector found no face
    NoFace,
    /// Ternary classification
    Category(EyeState),
    /// Continuous eye-aspect-ratio
    Ear(f32),
}

impl EyeObservation {
    /// Map detector glitches (NaN, infinite, outside [0, 1] EAR) to `NoFace`
    pub fn sanitized(self) -> Self {
        match self {
            Self::Ear(ear) if !ear.is_finite() || !(0.0..=1.0).contains(&ear) => Self::NoFace,
            other => other,
        }
    }
}

/// 2D image point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

/// 68-point facial landmarks for one face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct FaceLandmarks {
    points: Vec<Point>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Point>) -> Result<Self, DmsError> {
        if points.len() != FACE_LANDMARK_COUNT {
            return Err(DmsError::KeypointsMissing {
                expected: FACE_LANDMARK_COUNT,
                actual: points.len(),
            });
        }
        Ok(Self { points })
    }

    /// Points 36..42, outer corner first
    pub fn left_eye(&self) -> [Point; 6] {
        eye_points(&self.points[LEFT_EYE])
    }

    /// Points 42..48, inner corner first
    pub fn right_eye(&self) -> [Point; 6] {
        eye_points(&self.points[RIGHT_EYE])
    }
}

impl TryFrom<Vec<Point>> for FaceLandmarks {
    type Error = DmsError;

    fn try_from(points: Vec<Point>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<FaceLandmarks> for Vec<Point> {
    fn from(landmarks: FaceLandmarks) -> Self {
        landmarks.points
    }
}

fn eye_points(slice: &[Point]) -> [Point; 6] {
    let mut eye = [Point::default(); 6];
    eye.copy_from_slice(slice);
    eye
}

/// Eye aspect ratio: (|p1-p5| + |p2-p4|) / (2 * |p0-p3|)
///
/// The same quantity the blink classifier buckets. Returns NaN for a
/// degenerate eye whose corners coincide.
pub fn eye_aspect_ratio(eye: &[Point; 6]) -> f32 {
    let vertical = eye[1].distance(&eye[5]) + eye[2].distance(&eye[4]);
    let horizontal = eye[0].distance(&eye[3]);
    if horizontal <= f32::EPSILON {
        return f32::NAN;
    }
    vertical / (2.0 * horizontal)
}

/// Bucket a blink ratio into open / half-closed / closed
pub fn classify_blink_ratio(ratio: f32, config: &TrackerConfig) -> EyeState {
    if ratio > config.blink_open_ratio {
        EyeState::Open
    } else if ratio > config.blink_half_ratio {
        EyeState::HalfClosed
    } else {
        EyeState::Closed
    }
}

/// Reduce one face to the observation the configured strategy expects
pub fn observation_from_landmarks(
    landmarks: &FaceLandmarks,
    config: &TrackerConfig,
) -> EyeObservation {
    let left = eye_aspect_ratio(&landmarks.left_eye());
    let right = eye_aspect_ratio(&landmarks.right_eye());
    if !left.is_finite() || !right.is_finite() {
        return EyeObservation::NoFace;
    }

    match config.strategy {
        ClassificationStrategy::Ternary => {
            let states = [
                classify_blink_ratio(left, config),
                classify_blink_ratio(right, config),
            ];
            // One closed eye is enough
            let state = if states.contains(&EyeState::Closed) {
                EyeState::Closed
            } else if states.contains(&EyeState::HalfClosed) {
                EyeState::HalfClosed
            } else {
                EyeState::Open
            };
            EyeObservation::Category(state)
        }
        ClassificationStrategy::Ear => EyeObservation::Ear((left + right) / 2.0).sanitized(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Eye of width 4 whose lids sit `half_height` above and below the midline
    pub(crate) fn synthetic_eye(origin_x: f32, half_height: f32) -> [Point; 6] {
        [
            Point::new(origin_x, 0.0),
            Point::new(origin_x + 1.0, -half_height),
            Point::new(origin_x + 3.0, -half_height),
            Point::new(origin_x + 4.0, 0.0),
            Point::new(origin_x + 3.0, half_height),
            Point::new(origin_x + 1.0, half_height),
        ]
    }

    /// Full face with both eyes at the given lid heights
    pub(crate) fn synthetic_face(left_half_height: f32, right_half_height: f32) -> FaceLandmarks {
        let mut points = vec![Point::default(); FACE_LANDMARK_COUNT];
        points[LEFT_EYE].copy_from_slice(&synthetic_eye(0.0, left_half_height));
        points[RIGHT_EYE].copy_from_slice(&synthetic_eye(10.0, right_half_height));
        FaceLandmarks::new(points).unwrap()
    }

    #[test]
    fn test_ear_of_synthetic_eye() {
        // vertical = 2h + 2h, horizontal = 4 => ear = h / 2
        assert_relative_eq!(eye_aspect_ratio(&synthetic_eye(0.0, 1.0)), 0.5);
        assert_relative_eq!(eye_aspect_ratio(&synthetic_eye(5.0, 0.3)), 0.15, epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_eye_is_nan() {
        let eye = [Point::new(1.0, 1.0); 6];
        assert!(eye_aspect_ratio(&eye).is_nan());
    }

    #[test]
    fn test_blink_buckets() {
        let config = TrackerConfig::default();
        assert_eq!(classify_blink_ratio(0.30, &config), EyeState::Open);
        assert_eq!(classify_blink_ratio(0.25, &config), EyeState::HalfClosed);
        assert_eq!(classify_blink_ratio(0.22, &config), EyeState::HalfClosed);
        assert_eq!(classify_blink_ratio(0.21, &config), EyeState::Closed);
        assert_eq!(classify_blink_ratio(0.05, &config), EyeState::Closed);
    }

    #[test]
    fn test_one_closed_eye_wins() {
        let config = TrackerConfig::default();
        // ear 0.3 (open) and 0.1 (closed)
        let face = synthetic_face(0.6, 0.2);
        assert_eq!(
            observation_from_landmarks(&face, &config),
            EyeObservation::Category(EyeState::Closed)
        );

        // ear 0.3 (open) and 0.23 (half)
        let face = synthetic_face(0.6, 0.46);
        assert_eq!(
            observation_from_landmarks(&face, &config),
            EyeObservation::Category(EyeState::HalfClosed)
        );
    }

    #[test]
    fn test_ear_strategy_averages_eyes() {
        let config = TrackerConfig::default().with_strategy(ClassificationStrategy::Ear);
        let face = synthetic_face(0.6, 0.2);
        match observation_from_landmarks(&face, &config) {
            EyeObservation::Ear(ear) => assert_relative_eq!(ear, 0.2, epsilon = 1e-6),
            other => panic!("expected EAR, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_landmark_count() {
        let err = FaceLandmarks::new(vec![Point::default(); 5]).unwrap_err();
        assert!(matches!(
            err,
            DmsError::KeypointsMissing { expected: 68, actual: 5 }
        ));
    }

    #[test]
    fn test_sanitized() {
        assert_eq!(EyeObservation::Ear(f32::NAN).sanitized(), EyeObservation::NoFace);
        assert_eq!(EyeObservation::Ear(-0.1).sanitized(), EyeObservation::NoFace);
        assert_eq!(EyeObservation::Ear(1.5).sanitized(), EyeObservation::NoFace);
        assert_eq!(EyeObservation::Ear(0.2).sanitized(), EyeObservation::Ear(0.2));
        assert_eq!(
            EyeObservation::Category(EyeState::Open).sanitized(),
            EyeObservation::Category(EyeState::Open)
        );
    }
}
