//! End-to-end tests: build units as arena ASTs, compile them, and run
//! the resulting modules on the reference interpreter.

use bumpalo::Bump;
use rill_compiler::compile_unit;
use rill_compiler::ir::interp::{run_module, Execution, Scalar};
use rill_core::ast::*;
use rill_core::{CompilationError, Span};

fn sp() -> Span {
    Span::default()
}

/// Arena-backed AST construction helpers.
struct Ast<'a> {
    bump: &'a Bump,
}

impl<'a> Ast<'a> {
    fn new(bump: &'a Bump) -> Self {
        Self { bump }
    }

    fn exprs(&self, items: &[&'a Expr<'a>]) -> &'a [&'a Expr<'a>] {
        self.bump.alloc_slice_copy(items)
    }

    fn int(&self, value: i64) -> &'a Expr<'a> {
        self.bump.alloc(Expr::Literal(LiteralExpr {
            kind: LiteralKind::Int(value, 64),
            span: sp(),
        }))
    }

    fn int_w(&self, value: i64, width: u32) -> &'a Expr<'a> {
        self.bump.alloc(Expr::Literal(LiteralExpr {
            kind: LiteralKind::Int(value, width),
            span: sp(),
        }))
    }

    fn float(&self, value: f64) -> &'a Expr<'a> {
        self.bump.alloc(Expr::Literal(LiteralExpr {
            kind: LiteralKind::Float(value, 64),
            span: sp(),
        }))
    }

    fn ident(&self, name: &'a str) -> &'a Expr<'a> {
        self.bump
            .alloc(Expr::Ident(IdentExpr { name, span: sp() }))
    }

    fn bin(&self, op: BinaryOp, lhs: &'a Expr<'a>, rhs: &'a Expr<'a>) -> &'a Expr<'a> {
        self.bump.alloc(Expr::Binary(self.bump.alloc(BinaryExpr {
            op,
            lhs,
            rhs,
            span: sp(),
        })))
    }

    fn cmp(&self, op: CompareOp, lhs: &'a Expr<'a>, rhs: &'a Expr<'a>) -> &'a Expr<'a> {
        self.bump.alloc(Expr::Compare(self.bump.alloc(CompareExpr {
            op,
            lhs,
            rhs,
            span: sp(),
        })))
    }

    fn assign(&self, target: &'a Expr<'a>, value: &'a Expr<'a>) -> &'a Expr<'a> {
        self.bump.alloc(Expr::Assign(self.bump.alloc(AssignExpr {
            target,
            value,
            span: sp(),
        })))
    }

    fn member(&self, object: &'a Expr<'a>, field: &'a str) -> &'a Expr<'a> {
        self.bump.alloc(Expr::Member(self.bump.alloc(MemberExpr {
            object,
            field,
            span: sp(),
        })))
    }

    fn call(&self, name: &'a str, args: &[&'a Expr<'a>]) -> &'a Expr<'a> {
        self.bump.alloc(Expr::Call(self.bump.alloc(CallExpr {
            callee: Callee::Name(name),
            args: self.exprs(args),
            type_args: &[],
            span: sp(),
        })))
    }

    fn call_t(
        &self,
        name: &'a str,
        type_args: &[TypeExpr<'a>],
        args: &[&'a Expr<'a>],
    ) -> &'a Expr<'a> {
        self.bump.alloc(Expr::Call(self.bump.alloc(CallExpr {
            callee: Callee::Name(name),
            args: self.exprs(args),
            type_args: self.bump.alloc_slice_clone(type_args),
            span: sp(),
        })))
    }

    fn method(&self, object: &'a Expr<'a>, name: &'a str, args: &[&'a Expr<'a>]) -> &'a Expr<'a> {
        self.bump.alloc(Expr::Call(self.bump.alloc(CallExpr {
            callee: Callee::Method { object, name },
            args: self.exprs(args),
            type_args: &[],
            span: sp(),
        })))
    }

    fn ifx(&self, cond: &'a Expr<'a>, then: &'a Expr<'a>, els: &'a Expr<'a>) -> &'a Expr<'a> {
        self.bump.alloc(Expr::If(self.bump.alloc(IfExpr {
            conditions: self.exprs(&[cond]),
            branches: self.exprs(&[then]),
            else_branch: els,
            span: sp(),
        })))
    }

    fn stmts(&self, items: &[Stmt<'a>]) -> &'a [Stmt<'a>] {
        self.bump.alloc_slice_clone(items)
    }

    fn block(&self, items: &[Stmt<'a>]) -> Stmt<'a> {
        Stmt::Block(Block {
            stmts: self.stmts(items),
            span: sp(),
        })
    }

    fn expr_stmt(&self, expr: &'a Expr<'a>) -> Stmt<'a> {
        Stmt::Expr(expr)
    }

    fn var(&self, name: &'a str, ty: Option<TypeExpr<'a>>, init: Option<&'a Expr<'a>>) -> Stmt<'a> {
        Stmt::VarDecl(VarDeclStmt {
            name,
            ty,
            init,
            ctor_args: &[],
            span: sp(),
        })
    }

    fn var_ctor(&self, name: &'a str, class: &'a str, args: &[&'a Expr<'a>]) -> Stmt<'a> {
        Stmt::VarDecl(VarDeclStmt {
            name,
            ty: Some(TypeExpr::Named(class)),
            init: None,
            ctor_args: self.exprs(args),
            span: sp(),
        })
    }

    fn ret(&self, value: Option<&'a Expr<'a>>) -> Stmt<'a> {
        Stmt::Return(ReturnStmt { value, span: sp() })
    }

    fn if_stmt(&self, cond: &'a Expr<'a>, then: Stmt<'a>, els: Option<Stmt<'a>>) -> Stmt<'a> {
        Stmt::If(self.bump.alloc(IfStmt {
            conditions: self.exprs(&[cond]),
            branches: self.bump.alloc_slice_copy(&[&*self.bump.alloc(then)]),
            else_branch: els.map(|s| &*self.bump.alloc(s)),
            span: sp(),
        }))
    }

    fn while_stmt(&self, cond: &'a Expr<'a>, body: Stmt<'a>) -> Stmt<'a> {
        Stmt::While(self.bump.alloc(WhileStmt {
            condition: cond,
            body: self.bump.alloc(body),
            span: sp(),
        }))
    }

    fn do_while_stmt(&self, body: Stmt<'a>, cond: &'a Expr<'a>) -> Stmt<'a> {
        Stmt::DoWhile(self.bump.alloc(DoWhileStmt {
            body: self.bump.alloc(body),
            condition: cond,
            span: sp(),
        }))
    }

    fn params(&self, params: &[(&'a str, TypeExpr<'a>)]) -> &'a [Param<'a>] {
        let params: Vec<Param<'a>> = params
            .iter()
            .map(|(name, ty)| Param {
                name: *name,
                ty: ty.clone(),
            })
            .collect();
        self.bump.alloc_slice_clone(&params)
    }

    fn function(
        &self,
        name: &'a str,
        params: &[(&'a str, TypeExpr<'a>)],
        ret: TypeExpr<'a>,
        body: Stmt<'a>,
        no_mangle: bool,
    ) -> Decl<'a> {
        Decl::Function(self.bump.alloc(FunctionDecl {
            name,
            class: None,
            params: self.params(params),
            ret,
            variadic: false,
            template_params: &[],
            body: Some(self.bump.alloc(body)),
            no_mangle,
            span: sp(),
        }))
    }

    fn method_decl(
        &self,
        class: &'a str,
        name: &'a str,
        params: &[(&'a str, TypeExpr<'a>)],
        ret: TypeExpr<'a>,
        body: Stmt<'a>,
    ) -> Decl<'a> {
        Decl::Function(self.bump.alloc(FunctionDecl {
            name,
            class: Some(class),
            params: self.params(params),
            ret,
            variadic: false,
            template_params: &[],
            body: Some(self.bump.alloc(body)),
            no_mangle: false,
            span: sp(),
        }))
    }

    fn template(
        &self,
        name: &'a str,
        template_params: &[&'a str],
        params: &[(&'a str, TypeExpr<'a>)],
        ret: TypeExpr<'a>,
        body: Stmt<'a>,
    ) -> Decl<'a> {
        Decl::Function(self.bump.alloc(FunctionDecl {
            name,
            class: None,
            params: self.params(params),
            ret,
            variadic: false,
            template_params: self.bump.alloc_slice_copy(template_params),
            body: Some(self.bump.alloc(body)),
            no_mangle: false,
            span: sp(),
        }))
    }

    fn extern_fn(
        &self,
        name: &'a str,
        params: &[(&'a str, TypeExpr<'a>)],
        variadic: bool,
    ) -> Decl<'a> {
        Decl::Function(self.bump.alloc(FunctionDecl {
            name,
            class: None,
            params: self.params(params),
            ret: TypeExpr::Void,
            variadic,
            template_params: &[],
            body: None,
            no_mangle: true,
            span: sp(),
        }))
    }

    fn class(
        &self,
        name: &'a str,
        fields: &[(&'a str, TypeExpr<'a>, Option<&'a Expr<'a>>)],
    ) -> Decl<'a> {
        let fields: Vec<FieldDecl<'a>> = fields
            .iter()
            .map(|(name, ty, default)| FieldDecl {
                name: *name,
                ty: ty.clone(),
                default: *default,
                ctor_args: &[],
                span: sp(),
            })
            .collect();
        Decl::Class(self.bump.alloc(ClassDecl {
            name,
            fields: self.bump.alloc_slice_clone(&fields),
            span: sp(),
        }))
    }

    fn global(&self, name: &'a str, ty: TypeExpr<'a>, init: Option<&'a Expr<'a>>) -> Decl<'a> {
        Decl::Global(self.bump.alloc(GlobalDecl {
            name,
            ty,
            init,
            span: sp(),
        }))
    }

    fn unit(&self, decls: &[Decl<'a>]) -> Unit<'a> {
        Unit {
            decls: self.bump.alloc_slice_clone(decls),
            span: sp(),
        }
    }
}

fn run(unit: &Unit<'_>) -> Execution {
    let module = compile_unit("test", unit).expect("unit should compile");
    run_module(&module).expect("module should execute")
}

fn ret_int(exec: &Execution) -> i64 {
    match exec.ret {
        Some(Scalar::Int(v)) => v,
        ref other => panic!("expected integer result, got {other:?}"),
    }
}

fn ret_float(exec: &Execution) -> f64 {
    match exec.ret {
        Some(Scalar::Float(v)) => v,
        ref other => panic!("expected float result, got {other:?}"),
    }
}

// ============================================================================
// End-to-end programs
// ============================================================================

#[test]
fn factorial_loop_prints_120() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    let body = a.block(&[
        a.var("n", Some(TypeExpr::Int(64)), Some(a.int(5))),
        a.var("acc", Some(TypeExpr::Int(64)), Some(a.int(1))),
        a.while_stmt(
            a.cmp(CompareOp::Gt, a.ident("n"), a.int(1)),
            a.block(&[
                a.expr_stmt(a.assign(
                    a.ident("acc"),
                    a.bin(BinaryOp::Mul, a.ident("acc"), a.ident("n")),
                )),
                a.expr_stmt(a.assign(
                    a.ident("n"),
                    a.bin(BinaryOp::Sub, a.ident("n"), a.int(1)),
                )),
            ]),
        ),
        a.expr_stmt(a.call("print_i64", &[a.ident("acc")])),
        a.ret(Some(a.ident("acc"))),
    ]);
    let unit = a.unit(&[
        a.extern_fn("print_i64", &[("value", TypeExpr::Int(64))], true),
        a.function("main", &[], TypeExpr::Int(64), body, true),
    ]);

    let exec = run(&unit);
    assert_eq!(ret_int(&exec), 120);
    assert_eq!(exec.output, "120\n");
}

#[test]
fn mixed_arithmetic_unifies_to_float() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    let body = a.block(&[a.ret(Some(a.bin(BinaryOp::Add, a.int(1), a.float(2.5))))]);
    let unit = a.unit(&[a.function("main", &[], TypeExpr::Float(64), body, true)]);

    assert_eq!(ret_float(&run(&unit)), 3.5);
}

#[test]
fn shadowing_restores_outer_binding() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    let body = a.block(&[
        a.var("x", Some(TypeExpr::Int(64)), Some(a.int(2))),
        a.block(&[
            a.var("x", Some(TypeExpr::Int(64)), Some(a.int(3))),
            a.expr_stmt(a.assign(a.ident("x"), a.int(4))),
        ]),
        a.ret(Some(a.ident("x"))),
    ]);
    let unit = a.unit(&[a.function("main", &[], TypeExpr::Int(64), body, true)]);

    assert_eq!(ret_int(&run(&unit)), 2);
}

#[test]
fn overloads_dispatch_on_argument_type() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    let int_version = a.block(&[a.ret(Some(a.int(1)))]);
    let float_version = a.block(&[a.ret(Some(a.int(2)))]);
    // f(3) picks f(i64); f(2.5) picks f(f64).
    let main = a.block(&[a.ret(Some(a.bin(
        BinaryOp::Add,
        a.bin(BinaryOp::Mul, a.call("f", &[a.int(3)]), a.int(10)),
        a.call("f", &[a.float(2.5)]),
    )))]);
    let unit = a.unit(&[
        a.function(
            "f",
            &[("x", TypeExpr::Int(64))],
            TypeExpr::Int(64),
            int_version,
            false,
        ),
        a.function(
            "f",
            &[("x", TypeExpr::Float(64))],
            TypeExpr::Int(64),
            float_version,
            false,
        ),
        a.function("main", &[], TypeExpr::Int(64), main, true),
    ]);

    assert_eq!(ret_int(&run(&unit)), 12);
}

#[test]
fn infix_overload_beats_the_builtin_operator() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    // `+` dispatches to the user overload, which multiplies instead.
    let op_body = a.block(&[a.ret(Some(a.bin(
        BinaryOp::Mul,
        a.ident("lhs"),
        a.ident("rhs"),
    )))]);
    let unit = a.unit(&[
        a.function(
            "infix.+",
            &[("lhs", TypeExpr::Int(64)), ("rhs", TypeExpr::Int(64))],
            TypeExpr::Int(64),
            op_body,
            false,
        ),
        a.function(
            "main",
            &[],
            TypeExpr::Int(64),
            a.block(&[
                // The inferred type comes from the overload's signature.
                a.var("r", None, Some(a.bin(BinaryOp::Add, a.int(6), a.int(7)))),
                a.ret(Some(a.ident("r"))),
            ]),
            true,
        ),
    ]);

    assert_eq!(ret_int(&run(&unit)), 42);
}

#[test]
fn comparison_overload_keeps_its_declared_type() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    // `<` overloaded to yield the distance, not a boolean.
    let op_body = a.block(&[a.ret(Some(a.bin(
        BinaryOp::Sub,
        a.ident("rhs"),
        a.ident("lhs"),
    )))]);
    let unit = a.unit(&[
        a.function(
            "infix.<",
            &[("lhs", TypeExpr::Int(64)), ("rhs", TypeExpr::Int(64))],
            TypeExpr::Int(64),
            op_body,
            false,
        ),
        a.function(
            "main",
            &[],
            TypeExpr::Int(64),
            a.block(&[a.ret(Some(a.cmp(CompareOp::Lt, a.int(3), a.int(10))))]),
            true,
        ),
    ]);

    assert_eq!(ret_int(&run(&unit)), 7);
}

#[test]
fn calls_through_function_values_go_indirect() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    let twice_body = a.block(&[a.ret(Some(a.bin(BinaryOp::Mul, a.ident("x"), a.int(2))))]);
    let unit = a.unit(&[
        a.function(
            "twice",
            &[("x", TypeExpr::Int(64))],
            TypeExpr::Int(64),
            twice_body,
            false,
        ),
        a.function(
            "main",
            &[],
            TypeExpr::Int(64),
            a.block(&[
                a.var("f", None, Some(a.ident("twice"))),
                a.ret(Some(a.call("f", &[a.int(21)]))),
            ]),
            true,
        ),
    ]);

    let module = compile_unit("test", &unit).expect("unit should compile");
    assert!(module.print().contains("call_ptr"));
    let exec = run_module(&module).expect("module should execute");
    assert_eq!(ret_int(&exec), 42);
}

#[test]
fn branch_expression_unifies_both_ways() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    // Int-then-float and float-then-int both unify to f64.
    let body = a.block(&[
        a.var("taken", None, Some(a.ifx(a.int(1), a.int(1), a.float(2.0)))),
        a.var("skipped", None, Some(a.ifx(a.int(0), a.float(1.0), a.int(2)))),
        a.ret(Some(a.bin(
            BinaryOp::Add,
            a.bin(BinaryOp::Mul, a.ident("taken"), a.float(10.0)),
            a.ident("skipped"),
        ))),
    ]);
    let unit = a.unit(&[a.function("main", &[], TypeExpr::Float(64), body, true)]);

    assert_eq!(ret_float(&run(&unit)), 12.0);
}

#[test]
fn nested_branch_phi_uses_final_block() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    // The inner branch moves the insertion point, so the outer merge
    // must record the block the branch actually ended in.
    let inner = a.ifx(a.int(1), a.int(10), a.int(20));
    let body = a.block(&[a.ret(Some(a.ifx(a.int(1), inner, a.int(30))))]);
    let unit = a.unit(&[a.function("main", &[], TypeExpr::Int(64), body, true)]);

    assert_eq!(ret_int(&run(&unit)), 10);
}

#[test]
fn while_skips_and_do_while_runs_once() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    let body = a.block(&[
        a.var("n", Some(TypeExpr::Int(64)), Some(a.int(0))),
        a.while_stmt(
            a.int(0),
            a.block(&[a.expr_stmt(a.assign(
                a.ident("n"),
                a.bin(BinaryOp::Add, a.ident("n"), a.int(10)),
            ))]),
        ),
        a.do_while_stmt(
            a.block(&[a.expr_stmt(a.assign(
                a.ident("n"),
                a.bin(BinaryOp::Add, a.ident("n"), a.int(1)),
            ))]),
            a.int(0),
        ),
        a.ret(Some(a.ident("n"))),
    ]);
    let unit = a.unit(&[a.function("main", &[], TypeExpr::Int(64), body, true)]);

    assert_eq!(ret_int(&run(&unit)), 1);
}

#[test]
fn break_and_continue_target_innermost_loop() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    // i counts upward; odd iterations continue past the bump, i == 4
    // breaks before it. Only i == 2 increments n.
    let loop_body = a.block(&[
        a.expr_stmt(a.assign(
            a.ident("i"),
            a.bin(BinaryOp::Add, a.ident("i"), a.int(1)),
        )),
        a.if_stmt(
            a.cmp(CompareOp::Eq, a.ident("i"), a.int(4)),
            Stmt::Break(sp()),
            None,
        ),
        a.if_stmt(
            a.cmp(
                CompareOp::Eq,
                a.bin(BinaryOp::Rem, a.ident("i"), a.int(2)),
                a.int(1),
            ),
            Stmt::Continue(sp()),
            None,
        ),
        a.expr_stmt(a.assign(
            a.ident("n"),
            a.bin(BinaryOp::Add, a.ident("n"), a.int(1)),
        )),
    ]);
    let body = a.block(&[
        a.var("i", Some(TypeExpr::Int(64)), Some(a.int(0))),
        a.var("n", Some(TypeExpr::Int(64)), Some(a.int(0))),
        a.while_stmt(a.cmp(CompareOp::Lt, a.ident("i"), a.int(100)), loop_body),
        a.ret(Some(a.ident("n"))),
    ]);
    let unit = a.unit(&[a.function("main", &[], TypeExpr::Int(64), body, true)]);

    assert_eq!(ret_int(&run(&unit)), 1);
}

#[test]
fn loop_jumps_destroy_the_locals_they_skip() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    let dtor_body = a.block(&[a.expr_stmt(
        a.call("print_i64", &[a.member(a.ident("self"), "id")]),
    )]);
    // Iteration 1 leaves through `continue`, iteration 2 through a
    // `break` nested one block deeper; every exit tears down the scopes
    // it crosses, innermost first.
    let loop_body = a.block(&[
        a.expr_stmt(a.assign(
            a.ident("i"),
            a.bin(BinaryOp::Add, a.ident("i"), a.int(1)),
        )),
        a.var_ctor("t", "Tracer", &[]),
        a.expr_stmt(a.assign(
            a.member(a.ident("t"), "id"),
            a.bin(BinaryOp::Mul, a.ident("i"), a.int(10)),
        )),
        a.if_stmt(
            a.cmp(CompareOp::Eq, a.ident("i"), a.int(1)),
            Stmt::Continue(sp()),
            None,
        ),
        a.block(&[
            a.var_ctor("u", "Tracer", &[]),
            a.expr_stmt(a.assign(a.member(a.ident("u"), "id"), a.int(99))),
            Stmt::Break(sp()),
        ]),
    ]);
    let unit = a.unit(&[
        a.extern_fn("print_i64", &[("value", TypeExpr::Int(64))], true),
        a.class("Tracer", &[("id", TypeExpr::Int(64), None)]),
        a.method_decl("Tracer", "destructor", &[], TypeExpr::Void, dtor_body),
        a.function(
            "main",
            &[],
            TypeExpr::Int(64),
            a.block(&[
                a.var("i", Some(TypeExpr::Int(64)), Some(a.int(0))),
                a.while_stmt(a.cmp(CompareOp::Lt, a.ident("i"), a.int(10)), loop_body),
                a.ret(Some(a.ident("i"))),
            ]),
            true,
        ),
    ]);

    let exec = run(&unit);
    assert_eq!(ret_int(&exec), 2);
    assert_eq!(exec.output, "10\n99\n20\n");
}

#[test]
fn globals_initialize_before_main() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    let unit = a.unit(&[
        a.global(
            "g",
            TypeExpr::Int(64),
            Some(a.bin(
                BinaryOp::Add,
                a.bin(BinaryOp::Mul, a.int(3), a.int(4)),
                a.int(2),
            )),
        ),
        a.function(
            "main",
            &[],
            TypeExpr::Int(64),
            a.block(&[a.ret(Some(a.ident("g")))]),
            true,
        ),
    ]);

    assert_eq!(ret_int(&run(&unit)), 14);
}

#[test]
fn duplicate_global_definition_is_idempotent() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    let unit = a.unit(&[
        a.global("g", TypeExpr::Int(64), Some(a.int(7))),
        a.global("g", TypeExpr::Int(64), Some(a.int(7))),
        a.function(
            "main",
            &[],
            TypeExpr::Int(64),
            a.block(&[a.ret(Some(a.ident("g")))]),
            true,
        ),
    ]);

    assert_eq!(ret_int(&run(&unit)), 7);
}

// ============================================================================
// Classes
// ============================================================================

#[test]
fn fieldwise_defaults_and_zeroes() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    let unit = a.unit(&[
        a.class(
            "Point",
            &[
                ("x", TypeExpr::Int(64), Some(a.int(3))),
                ("y", TypeExpr::Int(64), None),
            ],
        ),
        a.function(
            "main",
            &[],
            TypeExpr::Int(64),
            a.block(&[
                a.var_ctor("p", "Point", &[]),
                a.ret(Some(a.bin(
                    BinaryOp::Add,
                    a.bin(BinaryOp::Mul, a.member(a.ident("p"), "x"), a.int(10)),
                    a.member(a.ident("p"), "y"),
                ))),
            ]),
            true,
        ),
    ]);

    assert_eq!(ret_int(&run(&unit)), 30);
}

#[test]
fn methods_mutate_through_the_receiver() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    let step_body = a.block(&[a.expr_stmt(a.assign(
        a.member(a.ident("self"), "n"),
        a.bin(BinaryOp::Add, a.member(a.ident("self"), "n"), a.int(1)),
    ))]);
    let unit = a.unit(&[
        a.class("Counter", &[("n", TypeExpr::Int(64), None)]),
        a.method_decl("Counter", "step", &[], TypeExpr::Void, step_body),
        a.function(
            "main",
            &[],
            TypeExpr::Int(64),
            a.block(&[
                a.var_ctor("c", "Counter", &[]),
                a.expr_stmt(a.method(a.ident("c"), "step", &[])),
                a.expr_stmt(a.method(a.ident("c"), "step", &[])),
                a.ret(Some(a.member(a.ident("c"), "n"))),
            ]),
            true,
        ),
    ]);

    assert_eq!(ret_int(&run(&unit)), 2);
}

#[test]
fn user_constructor_beats_fieldwise_init() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    let ctor_body = a.block(&[a.expr_stmt(a.assign(
        a.member(a.ident("self"), "n"),
        a.bin(BinaryOp::Mul, a.ident("seed"), a.int(2)),
    ))]);
    let unit = a.unit(&[
        a.class("Box", &[("n", TypeExpr::Int(64), Some(a.int(999)))]),
        a.method_decl(
            "Box",
            "constructor",
            &[("seed", TypeExpr::Int(64))],
            TypeExpr::Void,
            ctor_body,
        ),
        a.function(
            "main",
            &[],
            TypeExpr::Int(64),
            a.block(&[
                a.var_ctor("b", "Box", &[a.int(21)]),
                a.ret(Some(a.member(a.ident("b"), "n"))),
            ]),
            true,
        ),
    ]);

    assert_eq!(ret_int(&run(&unit)), 42);
}

#[test]
fn destructors_run_in_declaration_order_on_scope_exit() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    let dtor_body = a.block(&[a.expr_stmt(
        a.call("print_i64", &[a.member(a.ident("self"), "id")]),
    )]);
    let unit = a.unit(&[
        a.extern_fn("print_i64", &[("value", TypeExpr::Int(64))], true),
        a.class("Tracer", &[("id", TypeExpr::Int(64), None)]),
        a.method_decl("Tracer", "destructor", &[], TypeExpr::Void, dtor_body),
        a.function(
            "main",
            &[],
            TypeExpr::Int(64),
            a.block(&[
                a.block(&[
                    a.var_ctor("first", "Tracer", &[]),
                    a.expr_stmt(a.assign(a.member(a.ident("first"), "id"), a.int(1))),
                    a.var_ctor("second", "Tracer", &[]),
                    a.expr_stmt(a.assign(a.member(a.ident("second"), "id"), a.int(2))),
                ]),
                a.ret(Some(a.int(0))),
            ]),
            true,
        ),
    ]);

    let exec = run(&unit);
    assert_eq!(exec.output, "1\n2\n");
}

#[test]
fn destructors_run_on_early_return() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    let dtor_body = a.block(&[a.expr_stmt(
        a.call("print_i64", &[a.member(a.ident("self"), "id")]),
    )]);
    let unit = a.unit(&[
        a.extern_fn("print_i64", &[("value", TypeExpr::Int(64))], true),
        a.class("Tracer", &[("id", TypeExpr::Int(64), None)]),
        a.method_decl("Tracer", "destructor", &[], TypeExpr::Void, dtor_body),
        a.function(
            "main",
            &[],
            TypeExpr::Int(64),
            a.block(&[
                a.var_ctor("t", "Tracer", &[]),
                a.expr_stmt(a.assign(a.member(a.ident("t"), "id"), a.int(9))),
                // The return value is computed before teardown runs.
                a.ret(Some(a.member(a.ident("t"), "id"))),
            ]),
            true,
        ),
    ]);

    let exec = run(&unit);
    assert_eq!(ret_int(&exec), 9);
    assert_eq!(exec.output, "9\n");
}

#[test]
fn methods_borrow_the_receiver_without_destroying_it() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    let dtor_body = a.block(&[a.expr_stmt(
        a.call("print_i64", &[a.member(a.ident("self"), "id")]),
    )]);
    let poke_body = a.block(&[a.expr_stmt(a.assign(
        a.member(a.ident("self"), "id"),
        a.bin(BinaryOp::Add, a.member(a.ident("self"), "id"), a.int(1)),
    ))]);
    let unit = a.unit(&[
        a.extern_fn("print_i64", &[("value", TypeExpr::Int(64))], true),
        a.class("Tracer", &[("id", TypeExpr::Int(64), None)]),
        a.method_decl("Tracer", "destructor", &[], TypeExpr::Void, dtor_body),
        a.method_decl("Tracer", "poke", &[], TypeExpr::Void, poke_body),
        a.function(
            "main",
            &[],
            TypeExpr::Int(64),
            a.block(&[
                a.var_ctor("t", "Tracer", &[]),
                a.expr_stmt(a.assign(a.member(a.ident("t"), "id"), a.int(5))),
                a.expr_stmt(a.method(a.ident("t"), "poke", &[])),
                a.expr_stmt(a.method(a.ident("t"), "poke", &[])),
                a.ret(Some(a.int(0))),
            ]),
            true,
        ),
    ]);

    // The instance dies exactly once, at the end of main; neither method
    // call (nor the destructor itself) tears down its receiver.
    let exec = run(&unit);
    assert_eq!(exec.output, "7\n");
}

// ============================================================================
// Templates
// ============================================================================

#[test]
fn template_instances_compile_once_per_key() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    let template_body = a.block(&[a.ret(Some(a.bin(
        BinaryOp::Add,
        a.ident("x"),
        a.ident("x"),
    )))]);
    let unit = a.unit(&[
        a.template(
            "double",
            &["T"],
            &[("x", TypeExpr::Named("T"))],
            TypeExpr::Named("T"),
            template_body,
        ),
        a.function(
            "main",
            &[],
            TypeExpr::Int(64),
            a.block(&[a.ret(Some(a.bin(
                BinaryOp::Add,
                a.call_t("double", &[TypeExpr::Int(64)], &[a.int(20)]),
                a.call_t("double", &[TypeExpr::Int(64)], &[a.int(1)]),
            )))]),
            true,
        ),
    ]);

    let module = compile_unit("test", &unit).expect("unit should compile");
    // One instance serves both call sites.
    let instances = module
        .functions
        .iter()
        .filter(|f| f.name.starts_with("double<"))
        .count();
    assert_eq!(instances, 1);
    let exec = run_module(&module).expect("module should execute");
    assert_eq!(ret_int(&exec), 42);
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn undefined_symbol_aborts_the_unit() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    let unit = a.unit(&[a.function(
        "main",
        &[],
        TypeExpr::Int(64),
        a.block(&[a.ret(Some(a.ident("missing")))]),
        true,
    )]);

    let err = compile_unit("test", &unit).unwrap_err();
    assert!(matches!(err, CompilationError::UndefinedSymbol { .. }));
}

#[test]
fn equally_cheap_overloads_are_ambiguous() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    let unit = a.unit(&[
        a.function(
            "f",
            &[("x", TypeExpr::Int(64))],
            TypeExpr::Void,
            a.block(&[]),
            false,
        ),
        a.function(
            "f",
            &[("x", TypeExpr::Int(16))],
            TypeExpr::Void,
            a.block(&[]),
            false,
        ),
        a.function(
            "main",
            &[],
            TypeExpr::Int(64),
            a.block(&[
                a.expr_stmt(a.call("f", &[a.int_w(1, 32)])),
                a.ret(Some(a.int(0))),
            ]),
            true,
        ),
    ]);

    let err = compile_unit("test", &unit).unwrap_err();
    assert!(matches!(err, CompilationError::AmbiguousCall { .. }));
}

#[test]
fn branch_type_mismatch_is_reported() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    let unit = a.unit(&[
        a.extern_fn("noop", &[], false),
        a.function(
            "main",
            &[],
            TypeExpr::Int(64),
            a.block(&[a.ret(Some(a.ifx(a.int(1), a.int(1), a.call("noop", &[]))))]),
            true,
        ),
    ]);

    let err = compile_unit("test", &unit).unwrap_err();
    assert!(matches!(err, CompilationError::BranchTypeMismatch { .. }));
}

#[test]
fn break_outside_a_loop_is_rejected() {
    let bump = Bump::new();
    let a = Ast::new(&bump);

    let unit = a.unit(&[a.function(
        "main",
        &[],
        TypeExpr::Int(64),
        a.block(&[Stmt::Break(sp()), a.ret(Some(a.int(0)))]),
        true,
    )]);

    let err = compile_unit("test", &unit).unwrap_err();
    assert!(matches!(err, CompilationError::MisplacedControl { .. }));
}
