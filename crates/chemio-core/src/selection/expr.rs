use super::Match;
use crate::core::models::frame::Frame;
use phf::{Map, phf_map};
use std::fmt;

/// A component of a position or velocity vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coordinate {
    X,
    Y,
    Z,
}

impl Coordinate {
    fn index(self) -> usize {
        match self {
            Coordinate::X => 0,
            Coordinate::Y => 1,
            Coordinate::Z => 2,
        }
    }
}

/// String-valued atom properties usable in string predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringProperty {
    /// The atom name.
    Name,
    /// The atom chemical type.
    Type,
    /// The name of the residue containing the atom, if any.
    Resname,
}

impl StringProperty {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            StringProperty::Name => "name",
            StringProperty::Type => "type",
            StringProperty::Resname => "resname",
        }
    }

    /// The property value for the atom at `index`, or `None` when the
    /// property does not apply (missing atom or residue).
    fn value(self, frame: &Frame, index: usize) -> Option<&str> {
        match self {
            StringProperty::Name => Some(&frame.atom(index)?.name),
            StringProperty::Type => Some(&frame.atom(index)?.atom_type),
            StringProperty::Resname => Some(&frame.residue_for_atom(index)?.name),
        }
    }
}

/// Numeric-valued atom properties usable in math expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericProperty {
    /// The position of the atom in the frame's atom sequence.
    Index,
    /// The sequence number of the residue containing the atom.
    Resid,
    /// The atomic mass.
    Mass,
    /// A component of the atom position.
    Position(Coordinate),
    /// A component of the atom velocity.
    Velocity(Coordinate),
}

impl NumericProperty {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            NumericProperty::Index => "index",
            NumericProperty::Resid => "resid",
            NumericProperty::Mass => "mass",
            NumericProperty::Position(Coordinate::X) => "x",
            NumericProperty::Position(Coordinate::Y) => "y",
            NumericProperty::Position(Coordinate::Z) => "z",
            NumericProperty::Velocity(Coordinate::X) => "vx",
            NumericProperty::Velocity(Coordinate::Y) => "vy",
            NumericProperty::Velocity(Coordinate::Z) => "vz",
        }
    }

    /// The property value for the atom at `index`, or `None` when the
    /// property does not apply (missing atom, or `resid` on an atom outside
    /// any residue).
    fn value(self, frame: &Frame, index: usize) -> Option<f64> {
        match self {
            NumericProperty::Index => {
                frame.atom(index)?;
                Some(index as f64)
            }
            NumericProperty::Resid => {
                let id = frame.residue_for_atom(index)?.id?;
                Some(id as f64)
            }
            NumericProperty::Mass => Some(frame.atom(index)?.mass),
            NumericProperty::Position(coordinate) => {
                Some(frame.atom(index)?.position[coordinate.index()])
            }
            NumericProperty::Velocity(coordinate) => {
                Some(frame.atom(index)?.velocity[coordinate.index()])
            }
        }
    }
}

/// Comparison operators for math predicates, with IEEE semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl CmpOp {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            CmpOp::Equal => "==",
            CmpOp::NotEqual => "!=",
            CmpOp::Less => "<",
            CmpOp::LessEqual => "<=",
            CmpOp::Greater => ">",
            CmpOp::GreaterEqual => ">=",
        }
    }

    /// Applies the operator. NaN compares false to everything except
    /// through `!=`, per IEEE 754.
    pub(crate) fn compare(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CmpOp::Equal => lhs == rhs,
            CmpOp::NotEqual => lhs != rhs,
            CmpOp::Less => lhs < rhs,
            CmpOp::LessEqual => lhs <= rhs,
            CmpOp::Greater => lhs > rhs,
            CmpOp::GreaterEqual => lhs >= rhs,
        }
    }
}

/// The built-in unary math functions, resolved by name at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathFunction {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Sqrt,
    Exp,
    Ln,
    Abs,
}

pub(crate) static MATH_FUNCTIONS: Map<&'static str, MathFunction> = phf_map! {
    "sin" => MathFunction::Sin,
    "cos" => MathFunction::Cos,
    "tan" => MathFunction::Tan,
    "asin" => MathFunction::Asin,
    "acos" => MathFunction::Acos,
    "sqrt" => MathFunction::Sqrt,
    "exp" => MathFunction::Exp,
    "ln" => MathFunction::Ln,
    "abs" => MathFunction::Abs,
};

impl MathFunction {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            MathFunction::Sin => "sin",
            MathFunction::Cos => "cos",
            MathFunction::Tan => "tan",
            MathFunction::Asin => "asin",
            MathFunction::Acos => "acos",
            MathFunction::Sqrt => "sqrt",
            MathFunction::Exp => "exp",
            MathFunction::Ln => "ln",
            MathFunction::Abs => "abs",
        }
    }

    pub(crate) fn apply(self, x: f64) -> f64 {
        match self {
            MathFunction::Sin => x.sin(),
            MathFunction::Cos => x.cos(),
            MathFunction::Tan => x.tan(),
            MathFunction::Asin => x.asin(),
            MathFunction::Acos => x.acos(),
            MathFunction::Sqrt => x.sqrt(),
            MathFunction::Exp => x.exp(),
            MathFunction::Ln => x.ln(),
            MathFunction::Abs => x.abs(),
        }
    }
}

/// A string predicate: compares a string property of one bound atom
/// against a literal.
///
/// Negation is encoded in the `equals` flag rather than a wrapping `Not`
/// node, so `name != "O"` and `not name "O"` compile to the same selector.
#[derive(Debug, Clone, PartialEq)]
pub struct StringSelector {
    pub property: StringProperty,
    pub value: String,
    /// True for equality, false for inequality.
    pub equals: bool,
    /// Which slot of the candidate match this predicate reads (0-based).
    pub argument: usize,
}

impl StringSelector {
    fn is_match(&self, frame: &Frame, candidate: &Match) -> bool {
        let Some(index) = candidate.get(self.argument) else {
            return false;
        };
        let Some(value) = self.property.value(frame, index) else {
            return false;
        };
        (value == self.value) == self.equals
    }
}

/// A boolean selector node: the root family of a compiled selection tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    And(Box<Selector>, Box<Selector>),
    Or(Box<Selector>, Box<Selector>),
    Not(Box<Selector>),
    /// Matches every candidate.
    All,
    /// Matches no candidate.
    None,
    Str(StringSelector),
    /// A comparison between two math expressions.
    Math {
        op: CmpOp,
        lhs: MathExpr,
        rhs: MathExpr,
    },
}

impl Selector {
    /// Evaluates this selector against one candidate match in one frame.
    pub fn is_match(&self, frame: &Frame, candidate: &Match) -> bool {
        match self {
            Selector::And(lhs, rhs) => {
                lhs.is_match(frame, candidate) && rhs.is_match(frame, candidate)
            }
            Selector::Or(lhs, rhs) => {
                lhs.is_match(frame, candidate) || rhs.is_match(frame, candidate)
            }
            Selector::Not(inner) => !inner.is_match(frame, candidate),
            Selector::All => true,
            Selector::None => false,
            Selector::Str(string) => string.is_match(frame, candidate),
            Selector::Math { op, lhs, rhs } => {
                match (lhs.eval(frame, candidate), rhs.eval(frame, candidate)) {
                    (Some(lhs), Some(rhs)) => op.compare(lhs, rhs),
                    _ => false,
                }
            }
        }
    }

    /// The highest match slot referenced anywhere in the tree (0 when no
    /// explicit binding is present).
    pub(crate) fn max_argument(&self) -> usize {
        match self {
            Selector::And(lhs, rhs) | Selector::Or(lhs, rhs) => {
                lhs.max_argument().max(rhs.max_argument())
            }
            Selector::Not(inner) => inner.max_argument(),
            Selector::All | Selector::None => 0,
            Selector::Str(string) => string.argument,
            Selector::Math { lhs, rhs, .. } => lhs.max_argument().max(rhs.max_argument()),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Selector::Or(..) => 1,
            Selector::And(..) => 2,
            Selector::Not(..) => 3,
            _ => 4,
        }
    }
}

/// A numeric expression node, evaluated to `f64` inside comparisons.
#[derive(Debug, Clone, PartialEq)]
pub enum MathExpr {
    Add(Box<MathExpr>, Box<MathExpr>),
    Sub(Box<MathExpr>, Box<MathExpr>),
    Mul(Box<MathExpr>, Box<MathExpr>),
    Div(Box<MathExpr>, Box<MathExpr>),
    Pow(Box<MathExpr>, Box<MathExpr>),
    Neg(Box<MathExpr>),
    Function(MathFunction, Box<MathExpr>),
    Number(f64),
    Property {
        property: NumericProperty,
        /// Which slot of the candidate match this property reads (0-based).
        argument: usize,
    },
}

impl MathExpr {
    /// Evaluates the expression for one candidate match in one frame.
    ///
    /// Arithmetic follows IEEE semantics (division by zero gives infinity
    /// or NaN, never an error). `None` means an inapplicable property was
    /// reached; it propagates up and makes the enclosing comparison false.
    pub fn eval(&self, frame: &Frame, candidate: &Match) -> Option<f64> {
        match self {
            MathExpr::Add(lhs, rhs) => Some(lhs.eval(frame, candidate)? + rhs.eval(frame, candidate)?),
            MathExpr::Sub(lhs, rhs) => Some(lhs.eval(frame, candidate)? - rhs.eval(frame, candidate)?),
            MathExpr::Mul(lhs, rhs) => Some(lhs.eval(frame, candidate)? * rhs.eval(frame, candidate)?),
            MathExpr::Div(lhs, rhs) => Some(lhs.eval(frame, candidate)? / rhs.eval(frame, candidate)?),
            MathExpr::Pow(lhs, rhs) => {
                Some(lhs.eval(frame, candidate)?.powf(rhs.eval(frame, candidate)?))
            }
            MathExpr::Neg(inner) => Some(-inner.eval(frame, candidate)?),
            MathExpr::Function(function, inner) => {
                Some(function.apply(inner.eval(frame, candidate)?))
            }
            MathExpr::Number(value) => Some(*value),
            MathExpr::Property { property, argument } => {
                let index = candidate.get(*argument)?;
                property.value(frame, index)
            }
        }
    }

    pub(crate) fn max_argument(&self) -> usize {
        match self {
            MathExpr::Add(lhs, rhs)
            | MathExpr::Sub(lhs, rhs)
            | MathExpr::Mul(lhs, rhs)
            | MathExpr::Div(lhs, rhs)
            | MathExpr::Pow(lhs, rhs) => lhs.max_argument().max(rhs.max_argument()),
            MathExpr::Neg(inner) | MathExpr::Function(_, inner) => inner.max_argument(),
            MathExpr::Number(_) => 0,
            MathExpr::Property { argument, .. } => *argument,
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            MathExpr::Add(..) | MathExpr::Sub(..) => 1,
            MathExpr::Mul(..) | MathExpr::Div(..) => 2,
            MathExpr::Pow(..) => 3,
            _ => 4,
        }
    }
}

fn write_selector(
    f: &mut fmt::Formatter<'_>,
    node: &Selector,
    parent: u8,
    is_rhs: bool,
) -> fmt::Result {
    let precedence = node.precedence();
    if precedence < parent || (is_rhs && precedence == parent) {
        write!(f, "({node})")
    } else {
        write!(f, "{node}")
    }
}

impl fmt::Display for Selector {
    /// Prints a form that re-parses to an equivalent tree, with minimal
    /// parentheses derived from node precedence.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::And(lhs, rhs) => {
                write_selector(f, lhs, 2, false)?;
                write!(f, " and ")?;
                write_selector(f, rhs, 2, true)
            }
            Selector::Or(lhs, rhs) => {
                write_selector(f, lhs, 1, false)?;
                write!(f, " or ")?;
                write_selector(f, rhs, 1, true)
            }
            Selector::Not(inner) => {
                write!(f, "not ")?;
                write_selector(f, inner, 3, false)
            }
            Selector::All => write!(f, "all"),
            Selector::None => write!(f, "none"),
            Selector::Str(string) => {
                write!(f, "{}", string.property.as_str())?;
                if string.argument > 0 {
                    write!(f, "({})", string.argument + 1)?;
                }
                let operator = if string.equals { "==" } else { "!=" };
                write!(f, " {} \"{}\"", operator, string.value)
            }
            Selector::Math { op, lhs, rhs } => {
                write!(f, "{} {} {}", lhs, op.as_str(), rhs)
            }
        }
    }
}

fn write_math(
    f: &mut fmt::Formatter<'_>,
    node: &MathExpr,
    parent: u8,
    is_rhs: bool,
) -> fmt::Result {
    let precedence = node.precedence();
    if precedence < parent || (is_rhs && precedence == parent) {
        write!(f, "({node})")
    } else {
        write!(f, "{node}")
    }
}

impl fmt::Display for MathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MathExpr::Add(lhs, rhs) => {
                write_math(f, lhs, 1, false)?;
                write!(f, " + ")?;
                write_math(f, rhs, 1, true)
            }
            MathExpr::Sub(lhs, rhs) => {
                write_math(f, lhs, 1, false)?;
                write!(f, " - ")?;
                write_math(f, rhs, 1, true)
            }
            MathExpr::Mul(lhs, rhs) => {
                write_math(f, lhs, 2, false)?;
                write!(f, " * ")?;
                write_math(f, rhs, 2, true)
            }
            MathExpr::Div(lhs, rhs) => {
                write_math(f, lhs, 2, false)?;
                write!(f, " / ")?;
                write_math(f, rhs, 2, true)
            }
            // right-associative: parenthesize the left side on ties
            MathExpr::Pow(lhs, rhs) => {
                write_math(f, lhs, 3, true)?;
                write!(f, "^")?;
                write_math(f, rhs, 3, false)
            }
            MathExpr::Neg(inner) => {
                write!(f, "-")?;
                write_math(f, inner, 4, false)
            }
            MathExpr::Function(function, inner) => {
                write!(f, "{}({})", function.as_str(), inner)
            }
            MathExpr::Number(value) => write!(f, "{value}"),
            MathExpr::Property { property, argument } => {
                write!(f, "{}", property.as_str())?;
                if *argument > 0 {
                    write!(f, "({})", argument + 1)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::residue::Residue;
    use nalgebra::Point3;

    fn water() -> Frame {
        let mut frame = Frame::new();
        frame.add_atom(Atom::new("O"));
        frame.add_atom(Atom::new("H"));
        frame.add_atom(Atom::new("H"));
        frame.atom_mut(0).unwrap().position = Point3::new(0.0, 0.0, 0.0);
        frame.atom_mut(1).unwrap().position = Point3::new(0.76, 0.59, 0.0);
        frame.atom_mut(2).unwrap().position = Point3::new(-0.76, 0.59, 0.0);
        frame
    }

    fn name_is(value: &str, equals: bool) -> Selector {
        Selector::Str(StringSelector {
            property: StringProperty::Name,
            value: value.to_string(),
            equals,
            argument: 0,
        })
    }

    #[test]
    fn all_and_none_ignore_the_frame() {
        let frame = water();
        let candidate = Match::from([1]);
        assert!(Selector::All.is_match(&frame, &candidate));
        assert!(!Selector::None.is_match(&frame, &candidate));
    }

    #[test]
    fn string_selector_compares_with_the_equality_flag() {
        let frame = water();
        assert!(name_is("O", true).is_match(&frame, &Match::from([0])));
        assert!(!name_is("O", true).is_match(&frame, &Match::from([1])));
        assert!(name_is("O", false).is_match(&frame, &Match::from([1])));
        assert!(!name_is("O", false).is_match(&frame, &Match::from([0])));
    }

    #[test]
    fn string_selector_is_false_for_missing_atoms() {
        let frame = water();
        assert!(!name_is("O", true).is_match(&frame, &Match::from([17])));
    }

    #[test]
    fn resname_is_false_without_a_residue() {
        let frame = water();
        let selector = Selector::Str(StringSelector {
            property: StringProperty::Resname,
            value: "HOH".to_string(),
            equals: true,
            argument: 0,
        });
        assert!(!selector.is_match(&frame, &Match::from([0])));
    }

    #[test]
    fn logical_combinators_follow_boolean_semantics() {
        let frame = water();
        let candidate = Match::from([0]);
        let tree = Selector::And(
            Box::new(name_is("O", true)),
            Box::new(Selector::Not(Box::new(Selector::None))),
        );
        assert!(tree.is_match(&frame, &candidate));

        let tree = Selector::Or(Box::new(Selector::None), Box::new(name_is("H", true)));
        assert!(!tree.is_match(&frame, &candidate));
    }

    #[test]
    fn math_comparison_reads_properties() {
        let frame = water();
        let selector = Selector::Math {
            op: CmpOp::Greater,
            lhs: MathExpr::Property {
                property: NumericProperty::Mass,
                argument: 0,
            },
            rhs: MathExpr::Number(10.0),
        };
        assert!(selector.is_match(&frame, &Match::from([0])));
        assert!(!selector.is_match(&frame, &Match::from([1])));
    }

    #[test]
    fn resid_comparison_fails_open_without_a_residue() {
        let mut frame = water();
        let selector = Selector::Math {
            op: CmpOp::GreaterEqual,
            lhs: MathExpr::Property {
                property: NumericProperty::Resid,
                argument: 0,
            },
            rhs: MathExpr::Number(0.0),
        };
        assert!(!selector.is_match(&frame, &Match::from([0])));

        let mut residue = Residue::with_id("HOH", 3);
        residue.add_atom(0);
        frame.add_residue(residue).unwrap();
        assert!(selector.is_match(&frame, &Match::from([0])));
    }

    #[test]
    fn division_by_zero_follows_ieee() {
        let frame = water();
        let candidate = Match::from([0]);
        let infinity = MathExpr::Div(
            Box::new(MathExpr::Number(1.0)),
            Box::new(MathExpr::Number(0.0)),
        );
        assert_eq!(infinity.eval(&frame, &candidate), Some(f64::INFINITY));

        let nan = MathExpr::Sub(Box::new(infinity.clone()), Box::new(infinity));
        assert!(nan.eval(&frame, &candidate).unwrap().is_nan());
    }

    #[test]
    fn nan_comparisons_match_only_not_equal() {
        let nan = f64::NAN;
        assert!(!CmpOp::Equal.compare(nan, nan));
        assert!(!CmpOp::Less.compare(nan, 1.0));
        assert!(!CmpOp::LessEqual.compare(nan, 1.0));
        assert!(!CmpOp::Greater.compare(nan, 1.0));
        assert!(!CmpOp::GreaterEqual.compare(nan, 1.0));
        assert!(CmpOp::NotEqual.compare(nan, 1.0));
        assert!(CmpOp::NotEqual.compare(nan, nan));
    }

    #[test]
    fn functions_resolve_from_the_static_table() {
        assert_eq!(MATH_FUNCTIONS.get("sqrt"), Some(&MathFunction::Sqrt));
        assert_eq!(MATH_FUNCTIONS.get("banana"), None);
        assert_eq!(MathFunction::Sqrt.apply(4.0), 2.0);
        assert_eq!(MathFunction::Abs.apply(-2.5), 2.5);
        assert!(MathFunction::Sqrt.apply(-1.0).is_nan());
    }

    #[test]
    fn max_argument_walks_the_whole_tree() {
        let tree = Selector::And(
            Box::new(name_is("O", true)),
            Box::new(Selector::Math {
                op: CmpOp::Less,
                lhs: MathExpr::Property {
                    property: NumericProperty::Mass,
                    argument: 2,
                },
                rhs: MathExpr::Number(10.0),
            }),
        );
        assert_eq!(tree.max_argument(), 2);
        assert_eq!(Selector::All.max_argument(), 0);
    }

    #[test]
    fn display_uses_minimal_parentheses() {
        let tree = Selector::Or(
            Box::new(Selector::And(
                Box::new(Selector::All),
                Box::new(Selector::None),
            )),
            Box::new(Selector::Not(Box::new(name_is("O", true)))),
        );
        assert_eq!(tree.to_string(), "all and none or not name == \"O\"");

        let tree = Selector::And(
            Box::new(Selector::All),
            Box::new(Selector::Or(
                Box::new(Selector::None),
                Box::new(Selector::All),
            )),
        );
        assert_eq!(tree.to_string(), "all and (none or all)");
    }

    #[test]
    fn display_respects_math_associativity() {
        let expr = MathExpr::Sub(
            Box::new(MathExpr::Number(1.0)),
            Box::new(MathExpr::Add(
                Box::new(MathExpr::Number(2.0)),
                Box::new(MathExpr::Number(3.0)),
            )),
        );
        assert_eq!(expr.to_string(), "1 - (2 + 3)");

        let expr = MathExpr::Pow(
            Box::new(MathExpr::Pow(
                Box::new(MathExpr::Number(2.0)),
                Box::new(MathExpr::Number(3.0)),
            )),
            Box::new(MathExpr::Number(4.0)),
        );
        assert_eq!(expr.to_string(), "(2^3)^4");

        let expr = MathExpr::Neg(Box::new(MathExpr::Pow(
            Box::new(MathExpr::Number(2.0)),
            Box::new(MathExpr::Number(2.0)),
        )));
        assert_eq!(expr.to_string(), "-(2^2)");
    }

    #[test]
    fn display_prints_argument_bindings_one_based() {
        let selector = Selector::Str(StringSelector {
            property: StringProperty::Name,
            value: "H".to_string(),
            equals: true,
            argument: 1,
        });
        assert_eq!(selector.to_string(), "name(2) == \"H\"");

        let expr = MathExpr::Property {
            property: NumericProperty::Position(Coordinate::X),
            argument: 3,
        };
        assert_eq!(expr.to_string(), "x(4)");
    }
}
