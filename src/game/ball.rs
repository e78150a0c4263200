//! Implementation of the ball's movement and of its collisions with the walls and the paddles.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use rand::Rng;

use crate::game::constants::{
    BAND_ESCAPE_ROTATION, BOUNCE_JITTER, FORBIDDEN_HALF_BAND, PADDLE_SPEED_RESPONSE, RALLY_STEP,
};
use crate::game::paddle::Paddle;
use crate::game::settings::GameSettings;
use crate::game::side::Side;
use crate::game::vector::{Rect, Vec2};

/// Tolerance on band boundaries, so that a heading pushed onto a boundary is not seen as inside the band.
const ANGLE_EPSILON: f64 = 1.0e-9;

/// Outcome of one step of the ball.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Movement {
    /// Nothing was hit but maybe a wall.
    Rolling,
    /// The paddle of the given side returned the ball.
    Returned(Side),
    /// The ball left the field, the given side scored. The round is over.
    Scored(Side),
}

/// The ball : a square of side `unit` moving along `direction`.
#[derive(Clone, Debug)]
pub struct Ball {
    center: Vec2,
    direction: Vec2,
    speed: f64,
    rally: u32,
}

impl Ball {
    /// Create a ball at the center of the field, with a random serve heading.
    pub fn new<R: Rng + ?Sized>(settings: &GameSettings, rng: &mut R) -> Self {
        let mut ball = Ball {
            center: settings.field_center(),
            direction: Vec2::new(1.0, 0.0),
            speed: 0.0,
            rally: 0,
        };
        ball.update_size(settings, rng);
        ball.reset(settings);
        ball
    }

    /// Serve : put the ball back at the exact center of the field and forget the rally.
    pub fn reset(&mut self, settings: &GameSettings) {
        self.center = settings.field_center();
        self.rally = 0;
        self.speed = clamp_speed(settings.speed(), settings);
    }

    /// Pick a new random serve heading, used when the field changes.
    pub fn update_size<R: Rng + ?Sized>(&mut self, settings: &GameSettings, rng: &mut R) {
        let side: Side = rng.gen();
        let tilt = rng.gen_range(-FRAC_PI_4..FRAC_PI_4);
        let heading = Vec2::new(side.x_sign(), 0.0).rotated(tilt);
        self.set_direction(heading * settings.min_ball_speed().max(1.0), settings);
        self.speed = clamp_speed(self.speed, settings);
    }

    pub fn rect(&self, settings: &GameSettings) -> Rect {
        Rect::centered_at(self.center, settings.unit(), settings.unit())
    }

    /// Set the direction, keeping it out of the forbidden band and within the speed bounds.
    pub fn set_direction(&mut self, direction: Vec2, settings: &GameSettings) {
        if !direction.is_zero() {
            self.direction = fix_direction(direction, settings);
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Set the base speed, clamped to the bounds of the current field. Returns the speed actually set.
    pub fn set_speed(&mut self, speed: f64, settings: &GameSettings) -> f64 {
        self.speed = clamp_speed(speed, settings);
        self.speed
    }

    /// Map a normalized analog value onto the speed bounds. Returns the speed actually set.
    pub fn set_analog_speed(&mut self, value: f64, settings: &GameSettings) -> f64 {
        let value = value.clamp(0.0, 1.0);
        let (min, max) = (settings.min_ball_speed(), settings.max_ball_speed());
        self.set_speed(value * (max - min) + min, settings)
    }

    /// Speed the ball actually travels at : every [`RALLY_STEP`] consecutive returns add one unit to the base
    /// speed, the result never exceeding the maximum speed.
    pub fn effective_speed(&self, settings: &GameSettings) -> f64 {
        let boosted = self.speed + (self.rally / RALLY_STEP) as f64;
        boosted.min(settings.max_ball_speed())
    }

    /// Move the ball by one tick, bouncing off walls and paddles. When the ball leaves the field, the scoring
    /// paddle's score is increased and the ball is aimed at the scorer, ready for the next serve.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        paddles: &mut [Paddle; 2],
        settings: &GameSettings,
        rng: &mut R,
    ) -> Movement {
        let (width, height) = settings.field();
        self.speed = clamp_speed(self.speed, settings);

        let mut dir = fix_direction(self.heading() * self.effective_speed(settings), settings);

        // Top and bottom walls
        let rect = self.rect(settings);
        if (rect.top <= 0 && dir.y < 0.0) || (rect.bottom() >= height && dir.y > 0.0) {
            dir.y = -dir.y;
        }

        let next_center = self.center + dir;
        let [left, right] = paddles;

        if dir.x < 0.0 && self.collision(&left.rect(settings), next_center, settings) {
            self.bounce(left.velocity(), Side::Left, dir, settings, rng)
        } else if dir.x > 0.0 && self.collision(&right.rect(settings), next_center, settings) {
            self.bounce(right.velocity(), Side::Right, dir, settings, rng)
        } else if rect.left <= 0 || next_center.x < 0.0 {
            self.miss(left.rect(settings).center(), right, Side::Right, settings)
        } else if rect.right() >= width || next_center.x > width as f64 {
            self.miss(right.rect(settings).center(), left, Side::Left, settings)
        } else {
            self.direction = dir;
            self.center = clamp_inside(next_center, settings);
            Movement::Rolling
        }
    }

    /// Whether the ball hits the paddle during this tick : either they already overlap, or the ball's center
    /// crosses the paddle's center line within the paddle's height, which catches a fast ball tunneling through.
    fn collision(&self, paddle: &Rect, next_center: Vec2, settings: &GameSettings) -> bool {
        if paddle.intersects(&self.rect(settings)) {
            return true;
        }

        let paddle_x = paddle.center().x;
        if (self.center.x - paddle_x) * (next_center.x - paddle_x) > 0.0 {
            return false;
        }

        let lowest = f64::min(self.center.y, next_center.y);
        let highest = f64::max(self.center.y, next_center.y);
        lowest >= paddle.top as f64 && highest <= paddle.bottom() as f64
    }

    fn bounce<R: Rng + ?Sized>(
        &mut self,
        paddle_velocity: i32,
        side: Side,
        dir: Vec2,
        settings: &GameSettings,
        rng: &mut R,
    ) -> Movement {
        let (dir, multiplier) = change_dir_player(paddle_velocity, dir, settings, rng);
        self.speed = clamp_speed(self.speed * multiplier, settings);
        self.rally += 1;
        if self.rally % RALLY_STEP == 0 {
            log::debug!(
                "Rally of {} returns, speed bonus is now {}.",
                self.rally,
                self.rally / RALLY_STEP
            );
        }
        self.direction = dir;
        self.center = clamp_inside(self.center + dir, settings);
        Movement::Returned(side)
    }

    /// Aim the ball along the line from the losing paddle to the center of the field, at the minimum speed.
    fn miss(
        &mut self,
        loser_center: Vec2,
        scorer: &mut Paddle,
        scorer_side: Side,
        settings: &GameSettings,
    ) -> Movement {
        let aim = settings.field_center() - loser_center;
        let aim = if aim.x * scorer_side.x_sign() > 0.0 {
            aim
        } else {
            Vec2::new(scorer_side.x_sign(), 0.0)
        };
        self.set_direction(aim.with_norm(settings.min_ball_speed()), settings);
        scorer.increase_score();
        Movement::Scored(scorer_side)
    }

    /// Unit vector of the current heading.
    fn heading(&self) -> Vec2 {
        match self.direction.normalized() {
            heading if heading.is_zero() => Vec2::new(1.0, 0.0),
            heading => heading,
        }
    }
}

/// Bounce off a paddle : mirror the heading around the paddle's normal with some random jitter, and compute the
/// speed multiplier from the paddle's velocity.
///
/// A paddle moving the same way as the ball speeds it up, one moving against it slows it down.
fn change_dir_player<R: Rng + ?Sized>(
    paddle_velocity: i32,
    dir: Vec2,
    settings: &GameSettings,
    rng: &mut R,
) -> (Vec2, f64) {
    // Paddle velocity is positive upwards, the ball's y is positive downwards.
    let alignment = paddle_velocity as f64 * dir.y;
    let multiplier = if alignment < 0.0 {
        1.0 + PADDLE_SPEED_RESPONSE
    } else if alignment > 0.0 {
        1.0 - PADDLE_SPEED_RESPONSE
    } else {
        1.0
    };

    let jitter = rng.gen_range(-BOUNCE_JITTER..BOUNCE_JITTER);
    let mut dir = dir.rotated(-((dir.angle() + FRAC_PI_2) * 2.0 + jitter));

    if in_forbidden_band(dir.angle()) {
        // Turn towards the horizontal without changing the horizontal direction
        let facing = if dir.x >= 0.0 { -1.0 } else { 1.0 };
        dir = dir.rotated(facing * dir.y.signum() * BAND_ESCAPE_ROTATION);
    }

    (fix_direction(dir, settings), multiplier)
}

/// Whether the heading is too close to the vertical axis.
pub fn in_forbidden_band(angle: f64) -> bool {
    (angle.abs() - FRAC_PI_2).abs() < FORBIDDEN_HALF_BAND - ANGLE_EPSILON
}

/// Push a heading inside the forbidden band to the closest boundary of the band, keeping its vertical direction
/// and its length.
pub fn fix_angle(dir: Vec2) -> Vec2 {
    let angle = dir.angle();
    if !in_forbidden_band(angle) {
        return dir;
    }
    let sign = if angle >= 0.0 { 1.0 } else { -1.0 };
    let boundary = if angle.abs() <= FRAC_PI_2 {
        FRAC_PI_2 - FORBIDDEN_HALF_BAND
    } else {
        FRAC_PI_2 + FORBIDDEN_HALF_BAND
    };
    Vec2::from_angle(boundary * sign) * dir.norm()
}

/// Keep the direction out of the forbidden band and its length within the speed bounds of the field.
pub fn fix_direction(dir: Vec2, settings: &GameSettings) -> Vec2 {
    let dir = fix_angle(dir);
    let norm = dir.norm();
    if norm > settings.max_ball_speed() {
        dir.with_norm(settings.max_ball_speed())
    } else if norm < settings.min_ball_speed() {
        dir.with_norm(settings.min_ball_speed())
    } else {
        dir
    }
}

/// Keep a speed within the bounds of the field. The minimum wins over the maximum, and a non-finite speed becomes
/// the minimum.
fn clamp_speed(speed: f64, settings: &GameSettings) -> f64 {
    let (min, max) = (settings.min_ball_speed(), settings.max_ball_speed());
    if speed.is_finite() {
        speed.min(max).max(min)
    } else {
        min
    }
}

/// Keep the whole ball inside the field vertically.
fn clamp_inside(center: Vec2, settings: &GameSettings) -> Vec2 {
    let height = settings.field().1 as f64;
    let half = settings.unit() as f64 / 2.0;
    let y = if height >= 2.0 * half {
        center.y.clamp(half, height - half)
    } else {
        height / 2.0
    };
    Vec2::new(center.x, y)
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    const BIAS: f64 = 1.0e-7;

    fn settings() -> GameSettings {
        let mut settings = GameSettings::default();
        settings.set_field(800, 600);
        settings.set_unit(10);
        settings
    }

    fn paddles(settings: &GameSettings) -> [Paddle; 2] {
        [
            Paddle::new("left", 10, settings),
            Paddle::new("right", 785, settings),
        ]
    }

    /// Move both paddles to the top of the field, out of the ball's way.
    fn paddles_out_of_the_way(settings: &GameSettings) -> [Paddle; 2] {
        let mut paddles = paddles(settings);
        paddles.iter_mut().for_each(|p| p.set_pos(1.0, settings));
        paddles
    }

    fn assert_outside_band(dir: Vec2) {
        let from_vertical = (dir.angle().abs() - FRAC_PI_2).abs();
        assert!(
            from_vertical >= FORBIDDEN_HALF_BAND - BIAS,
            "heading {} is in the forbidden band",
            dir.angle()
        );
    }

    #[test]
    fn fix_angle_pushes_to_band_boundaries() {
        let lower = FRAC_PI_2 - FORBIDDEN_HALF_BAND;
        let upper = FRAC_PI_2 + FORBIDDEN_HALF_BAND;
        for (angle, expected) in [
            (FRAC_PI_2 - 0.1, lower),
            (FRAC_PI_2 + 0.1, upper),
            (-(FRAC_PI_2 - 0.1), -lower),
            (-(FRAC_PI_2 + 0.1), -upper),
            (FRAC_PI_2, lower),
        ] {
            let fixed = fix_angle(Vec2::from_angle(angle) * 3.0);
            assert!((fixed.angle() - expected).abs() < BIAS, "{angle} -> {}", fixed.angle());
            assert!((fixed.norm() - 3.0).abs() < BIAS);
        }
        let flat = Vec2::from_angle(0.2) * 3.0;
        assert_eq!(fix_angle(flat), flat);
        let backwards = Vec2::from_angle(PI - 0.2);
        assert_eq!(fix_angle(backwards), backwards);
    }

    #[test]
    fn fix_direction_clamps_magnitude() {
        let s = settings();
        assert!((fix_direction(Vec2::new(100.0, 0.0), &s).norm() - 16.0).abs() < BIAS);
        assert!((fix_direction(Vec2::new(0.5, 0.0), &s).norm() - 4.0).abs() < BIAS);
        assert!((fix_direction(Vec2::new(8.0, 0.0), &s).norm() - 8.0).abs() < BIAS);
    }

    #[test]
    fn reset_is_idempotent() {
        let s = settings();
        let mut rng = StdRng::seed_from_u64(1);
        let mut ball = Ball::new(&s, &mut rng);
        ball.center = Vec2::new(123.4, 56.7);
        ball.rally = 7;
        ball.speed = 5.5;

        ball.reset(&s);
        let (center, speed, rally) = (ball.center, ball.speed, ball.rally);
        ball.reset(&s);
        assert_eq!(ball.center, center);
        assert_eq!(ball.speed, speed);
        assert_eq!(ball.rally, rally);
        assert_eq!(center, Vec2::new(400.0, 300.0));
        assert_eq!(rally, 0);
        assert_eq!(speed, 16.0);
    }

    #[test]
    fn straight_ball_scores_exactly_once() {
        let s = settings();
        let mut rng = StdRng::seed_from_u64(2);
        let mut paddles = paddles_out_of_the_way(&s);
        let mut ball = Ball::new(&s, &mut rng);
        ball.set_speed(s.min_ball_speed(), &s);
        ball.set_direction(Vec2::new(1.0, 0.0), &s);

        let mut scored = None;
        for _ in 0..1000 {
            match ball.advance(&mut paddles, &s, &mut rng) {
                Movement::Rolling => {}
                Movement::Returned(side) => panic!("unexpected return by {side:?}"),
                Movement::Scored(side) => {
                    scored = Some(side);
                    break;
                }
            }
        }
        assert_eq!(scored, Some(Side::Left));
        assert_eq!(paddles[0].score(), 1);
        assert_eq!(paddles[1].score(), 0);
        assert!(ball.rect(&s).right() >= 800);
    }

    #[test]
    fn crossing_the_right_edge_ends_the_round() {
        let s = settings();
        let mut rng = StdRng::seed_from_u64(3);
        let mut paddles = paddles_out_of_the_way(&s);
        let mut ball = Ball::new(&s, &mut rng);
        ball.set_speed(s.max_ball_speed(), &s);
        ball.set_direction(Vec2::new(1.0, 0.0), &s);
        ball.center = Vec2::new(794.0, 300.0);
        ball.rally = 5;
        assert!(ball.rect(&s).right() < 800);

        let movement = ball.advance(&mut paddles, &s, &mut rng);
        assert_eq!(movement, Movement::Scored(Side::Left));
        assert_eq!(paddles[0].score(), 1);
        // The next serve goes towards the scorer, at minimum speed
        assert!(ball.direction.x < 0.0);
        assert!((ball.direction.norm() - s.min_ball_speed()).abs() < BIAS);

        ball.reset(&s);
        assert_eq!(ball.rally, 0);
    }

    #[test]
    fn left_edge_scores_for_player_two() {
        let s = settings();
        let mut rng = StdRng::seed_from_u64(4);
        let mut paddles = paddles_out_of_the_way(&s);
        let mut ball = Ball::new(&s, &mut rng);
        ball.set_direction(Vec2::new(-1.0, 0.0), &s);
        ball.center = Vec2::new(5.0, 300.0);

        assert_eq!(
            ball.advance(&mut paddles, &s, &mut rng),
            Movement::Scored(Side::Right)
        );
        assert_eq!(paddles[1].score(), 1);
        assert!(ball.direction.x > 0.0);
    }

    #[test]
    fn stationary_paddle_keeps_speed() {
        let s = settings();
        let mut rng = StdRng::seed_from_u64(5);
        let mut paddles = paddles(&s);
        let mut ball = Ball::new(&s, &mut rng);
        ball.set_speed(10.0, &s);
        ball.set_direction(Vec2::from_angle(PI - 0.3), &s);
        ball.center = Vec2::new(16.0, 300.0);
        assert_eq!(paddles[0].velocity(), 0);

        let movement = ball.advance(&mut paddles, &s, &mut rng);
        assert_eq!(movement, Movement::Returned(Side::Left));
        assert_eq!(ball.speed(), 10.0);
        assert_eq!(ball.rally, 1);
        assert!(ball.direction.x > 0.0);
        assert_outside_band(ball.direction);
    }

    #[test]
    fn paddle_movement_changes_speed() {
        let s = settings();
        let mut rng = StdRng::seed_from_u64(6);

        // Paddle moving up, ball moving up : speed up
        let mut paddles = paddles(&s);
        paddles[0].set_speed(-6, &s);
        paddles[0].advance(&s);
        assert!(paddles[0].velocity() > 0);
        let mut ball = Ball::new(&s, &mut rng);
        ball.set_speed(10.0, &s);
        ball.set_direction(Vec2::from_angle(-(PI - 0.3)), &s);
        ball.center = Vec2::new(16.0, 300.0);
        assert_eq!(
            ball.advance(&mut paddles, &s, &mut rng),
            Movement::Returned(Side::Left)
        );
        assert!((ball.speed() - 12.0).abs() < BIAS);

        // Paddle moving up, ball moving down : slow down
        let mut ball = Ball::new(&s, &mut rng);
        ball.set_speed(10.0, &s);
        ball.set_direction(Vec2::from_angle(PI - 0.3), &s);
        ball.center = Vec2::new(16.0, 300.0);
        assert_eq!(
            ball.advance(&mut paddles, &s, &mut rng),
            Movement::Returned(Side::Left)
        );
        assert!((ball.speed() - 8.0).abs() < BIAS);
    }

    #[test]
    fn fast_ball_does_not_tunnel_through_paddle() {
        let s = settings();
        let mut rng = StdRng::seed_from_u64(7);
        let mut paddles = paddles(&s);
        let mut ball = Ball::new(&s, &mut rng);
        ball.set_speed(s.max_ball_speed(), &s);
        ball.set_direction(Vec2::new(1.0, 0.0), &s);
        // Right paddle covers x in 780..790, center line at 785
        ball.center = Vec2::new(772.0, 300.0);
        assert!(!paddles[1].rect(&s).intersects(&ball.rect(&s)));

        assert_eq!(
            ball.advance(&mut paddles, &s, &mut rng),
            Movement::Returned(Side::Right)
        );
        assert!(ball.direction.x < 0.0);
    }

    #[test]
    fn ball_moving_away_from_paddle_is_not_returned() {
        let s = settings();
        let mut rng = StdRng::seed_from_u64(8);
        let mut paddles = paddles(&s);
        let mut ball = Ball::new(&s, &mut rng);
        ball.set_direction(Vec2::new(1.0, 0.0), &s);
        ball.center = Vec2::new(16.0, 300.0);
        assert_eq!(
            ball.advance(&mut paddles, &s, &mut rng),
            Movement::Rolling
        );
    }

    #[test]
    fn walls_reflect_vertical_direction() {
        let s = settings();
        let mut rng = StdRng::seed_from_u64(9);
        let mut paddles = paddles_out_of_the_way(&s);
        let mut ball = Ball::new(&s, &mut rng);
        ball.set_speed(s.min_ball_speed(), &s);
        ball.set_direction(Vec2::from_angle(-0.5), &s);
        ball.center = Vec2::new(400.0, 5.0);
        assert_eq!(ball.advance(&mut paddles, &s, &mut rng), Movement::Rolling);
        assert!(ball.direction.y > 0.0);
        assert!(ball.rect(&s).top >= 0);

        ball.set_direction(Vec2::from_angle(0.5), &s);
        ball.center = Vec2::new(400.0, 595.0);
        assert_eq!(ball.advance(&mut paddles, &s, &mut rng), Movement::Rolling);
        assert!(ball.direction.y < 0.0);
        assert!(ball.rect(&s).bottom() <= 600);
    }

    #[test]
    fn long_rally_is_faster_but_bounded() {
        let s = settings();
        let mut rng = StdRng::seed_from_u64(10);
        let mut ball = Ball::new(&s, &mut rng);
        ball.set_speed(10.0, &s);
        let base = ball.effective_speed(&s);
        ball.rally = 12;
        assert!(ball.effective_speed(&s) > base);
        assert!((ball.effective_speed(&s) - 11.0).abs() < BIAS);

        ball.set_speed(s.max_ball_speed(), &s);
        assert!(ball.effective_speed(&s) <= s.max_ball_speed());

        let mut paddles = paddles_out_of_the_way(&s);
        ball.set_direction(Vec2::new(1.0, 0.0), &s);
        ball.advance(&mut paddles, &s, &mut rng);
        assert!(ball.direction.norm() <= s.max_ball_speed() + BIAS);
    }

    #[test]
    fn analog_speed_spans_the_bounds() {
        let s = settings();
        let mut rng = StdRng::seed_from_u64(11);
        let mut ball = Ball::new(&s, &mut rng);
        assert_eq!(ball.set_analog_speed(0.0, &s), 4.0);
        assert_eq!(ball.set_analog_speed(1.0, &s), 16.0);
        assert_eq!(ball.set_analog_speed(0.5, &s), 10.0);
        assert_eq!(ball.set_analog_speed(7.0, &s), 16.0);
        assert_eq!(ball.set_speed(f64::NAN, &s), 4.0);
    }

    #[test]
    fn inverted_speed_bounds_do_not_panic() {
        // Unsanitized settings with a negative width give a minimum above the maximum
        let s: GameSettings = serde_json::from_str(r#"{"field_width": -100}"#).unwrap();
        assert!(s.min_ball_speed() > s.max_ball_speed());
        assert_eq!(clamp_speed(3.0, &s), s.min_ball_speed());
        assert_eq!(clamp_speed(f64::INFINITY, &s), s.min_ball_speed());
    }

    #[test]
    fn invariants_hold_over_a_long_game() {
        let s = settings();
        let mut rng = StdRng::seed_from_u64(12);
        let mut paddles = paddles(&s);
        let mut ball = Ball::new(&s, &mut rng);
        let (mut returns, mut scores) = (0, 0);

        for tick in 0..20_000 {
            // Imperfect tracking : paddles follow the ball with a lag
            let target = 1.0 - ball.rect(&s).center().y / 600.0;
            for (i, paddle) in paddles.iter_mut().enumerate() {
                if (tick / 500 + i) % 3 != 0 {
                    paddle.set_pos(target, &s);
                } else {
                    paddle.release_controller();
                    paddle.set_speed(if tick % 120 < 60 { 6 } else { -6 }, &s);
                    paddle.advance(&s);
                }
            }

            let movement = ball.advance(&mut paddles, &s, &mut rng);
            assert!(ball.speed() >= s.min_ball_speed() && ball.speed() <= s.max_ball_speed());
            assert!(ball.direction.norm() <= s.max_ball_speed() + BIAS);
            assert!(ball.direction.norm() >= s.min_ball_speed() - BIAS);
            assert_outside_band(ball.direction);
            let rect = ball.rect(&s);
            assert!(rect.top >= 0 && rect.bottom() <= 600, "{rect:?}");
            for paddle in &paddles {
                let rect = paddle.rect(&s);
                assert!(rect.top >= 0 && rect.bottom() <= 600);
            }

            match movement {
                Movement::Rolling => {}
                Movement::Returned(_) => returns += 1,
                Movement::Scored(_) => {
                    scores += 1;
                    ball.reset(&s);
                }
            }
        }
        assert!(returns > 0);
        assert!(scores > 0);
        assert_eq!(paddles[0].score() + paddles[1].score(), scores);
    }
}
